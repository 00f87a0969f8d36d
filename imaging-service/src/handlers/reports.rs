use crate::dtos::{ReportListParams, ReportListResponse, ReportResponse, DEFAULT_PAGE_LIMIT};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportListParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let image_id = params.image_id.as_deref();

    let total = state.db.count_reports(image_id).await?;
    let reports = state
        .db
        .list_reports(image_id, limit, offset)
        .await?
        .into_iter()
        .map(ReportResponse::from)
        .collect();

    Ok(Json(ReportListResponse { reports, total }))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = state
        .db
        .get_report(&report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Report {} not found", report_id)))?;

    Ok(Json(ReportResponse::from(report)))
}
