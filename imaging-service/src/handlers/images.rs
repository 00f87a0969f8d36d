use crate::dtos::{
    ImageListParams, ImageListResponse, ImageResponse, ReportResponse, UploadImageResponse,
    DEFAULT_PAGE_LIMIT,
};
use crate::models::Image;
use crate::services::metrics::{record_analysis, record_upload};
use crate::services::sanitize_filename;
use crate::services::storage::StorageWriter;
use crate::startup::AppState;
use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use validator::Validate;

/// Accepts a multipart upload, stores it, runs analysis and persists the result.
///
/// Only the part named `file` is used; any other parts are skipped.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let response = store_and_analyze(&state, field).await?;
        return Ok(Json(response));
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded")))
}

async fn store_and_analyze(
    state: &AppState,
    mut field: Field<'_>,
) -> Result<UploadImageResponse, AppError> {
    let filename = field
        .file_name()
        .and_then(sanitize_filename)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid or missing file name")))?;
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut image = Image::new(filename, content_type);

    tracing::info!(
        image_id = %image.id,
        filename = %image.filename,
        "Image upload started"
    );

    // 1. Stream to storage
    let mut writer = state.storage.writer(&image.storage_key).await?;
    let written = write_field(&mut field, &mut writer).await;
    drop(writer);

    let size = match written {
        Ok(0) => {
            state.storage.delete(&image.storage_key).await?;
            return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
        }
        Ok(size) => size,
        Err(e) => {
            tracing::warn!(image_id = %image.id, "Upload aborted: {}", e);
            state.storage.delete(&image.storage_key).await?;
            return Err(e);
        }
    };
    image.size = size as i64;
    record_upload(size);

    // 2. Run analysis on the stored file
    let path = state.storage.path_for(&image.storage_key);
    let started = Instant::now();
    let result = state.analyzer.analyze(&path, &image.content_type).await;
    record_analysis(state.analyzer.name(), started.elapsed(), result.is_ok());

    let findings = result.map_err(|e| {
        tracing::error!(
            image_id = %image.id,
            analyzer = %state.analyzer.name(),
            "Image analysis failed: {}",
            e
        );
        AppError::from(e)
    })?;

    // 3. Persist image metadata and report
    state
        .db
        .save_image_and_report(&image, &findings)
        .await
        .map_err(|e| {
            tracing::error!(image_id = %image.id, "Failed to save image and report: {}", e);
            e
        })?;

    tracing::info!(
        image_id = %image.id,
        size = size,
        confidence = findings.confidence,
        "Image upload completed successfully"
    );

    Ok(UploadImageResponse {
        image_id: image.id,
        report: findings,
    })
}

async fn write_field(field: &mut Field<'_>, writer: &mut StorageWriter) -> Result<u64, AppError> {
    let mut size: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::StorageError(anyhow::anyhow!("Failed to write upload: {}", e)))?;
        size += chunk.len() as u64;
    }
    writer
        .shutdown()
        .await
        .map_err(|e| AppError::StorageError(anyhow::anyhow!("Failed to flush upload: {}", e)))?;
    Ok(size)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("Uploaded file exceeds the size limit"))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart body: {}", err))
    }
}

pub async fn list_images(
    State(state): State<AppState>,
    Query(params): Query<ImageListParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let total = state.db.count_images().await?;
    let images = state
        .db
        .list_images(limit, offset)
        .await?
        .into_iter()
        .map(ImageResponse::from)
        .collect();

    Ok(Json(ImageListResponse { images, total }))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let image = find_image(&state, &image_id).await?;
    let report = state
        .db
        .get_report_for_image(&image.id)
        .await?
        .map(ReportResponse::from);

    Ok(Json(ImageResponse::from(image).with_report(report)))
}

/// Streams the stored file back with its original content type.
pub async fn get_image_file(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let image = find_image(&state, &image_id).await?;
    let reader = state.storage.reader(&image.storage_key).await?;

    let content_type = HeaderValue::from_str(&image.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        image.filename.replace('"', "_")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(reader)),
    ))
}

async fn find_image(state: &AppState, image_id: &str) -> Result<Image, AppError> {
    state
        .db
        .get_image(image_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Image {} not found", image_id)))
}
