use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Query, State},
    response::IntoResponse,
};

use super::AppState;
use super::dto::{SchemaParams, UploadForm, VersionsParams};
use super::response::{ApiError, ApiResponse};
use crate::types::VersionSelector;

pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

async fn parse_multipart_upload(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("file") => {
                form.filename = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
                if data.len() > MAX_UPLOAD_SIZE {
                    return Err(ApiError::payload_too_large(format!(
                        "File size ({} bytes) exceeds maximum allowed size ({MAX_UPLOAD_SIZE} bytes)",
                        data.len()
                    )));
                }
                form.content = Some(data.to_vec());
            }
            Some("application") => {
                form.application = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read application: {e}"))
                })?);
            }
            Some("service") => {
                form.service = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read service: {e}"))
                })?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /upload - Store a new version of a schema document
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_multipart_upload(&mut multipart).await?;

    let application = form.application.unwrap_or_default();
    if application.is_empty() {
        return Err(ApiError::bad_request("application is required"));
    }
    let content = form
        .content
        .ok_or_else(|| ApiError::bad_request("file is required"))?;
    let filename = form
        .filename
        .ok_or_else(|| ApiError::bad_request("file name is required"))?;

    let receipt = state
        .registry
        .ingest(&application, form.service.as_deref(), &filename, &content)
        .await?;

    Ok(Json(ApiResponse::success(receipt)))
}

/// GET /schema - Fetch the latest or a specific version of a schema
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SchemaParams>,
) -> Result<impl IntoResponse, ApiError> {
    let selector = params
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(VersionSelector::LATEST);

    let schema = state
        .registry
        .resolve(
            params.application.as_deref().unwrap_or_default(),
            params.service.as_deref(),
            selector,
        )
        .await?;

    Ok(Json(ApiResponse::success(schema)))
}

/// GET /schema/versions - List every version in a scope, newest first
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VersionsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state
        .registry
        .list_versions(
            params.application.as_deref().unwrap_or_default(),
            params.service.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(listing)))
}
