use super::reports::ReportResponse;
use crate::models::{AnalysisReport, Image};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body returned by the upload endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub image_id: String,
    pub report: AnalysisReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportResponse>,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        Self {
            id: image.id,
            filename: image.filename,
            content_type: image.content_type,
            size: image.size,
            created_at: image.created_at.to_rfc3339(),
            report: None,
        }
    }
}

impl ImageResponse {
    pub fn with_report(mut self, report: Option<ReportResponse>) -> Self {
        self.report = report;
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImageListParams {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageListResponse {
    pub images: Vec<ImageResponse>,
    pub total: i64,
}
