use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Output of an analyzer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub findings: String,
    pub diagnosis: String,
    pub recommendations: String,
    /// Model confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Identifier of the analyzer that produced the report.
    pub model: String,
}

/// A persisted analysis report, one per image.
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: String,
    pub image_id: String,
    pub findings: Json<AnalysisReport>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(image_id: String, findings: AnalysisReport) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image_id,
            findings: Json(findings),
            created_at: Utc::now(),
        }
    }
}
