//! Upload form endpoints.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;

use super::{parse_category, success, ApiResult};
use crate::errors::AppError;
use crate::models::UploadFile;
use crate::upload::UploadFormView;
use crate::AppState;

/// Absent fields are left untouched; empty strings unset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFieldsRequest {
    #[serde(default)]
    pub document_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// GET /api/upload - Current upload form state.
pub async fn get_upload(State(state): State<AppState>) -> ApiResult<UploadFormView> {
    success(state.upload.lock().await.view())
}

/// PUT /api/upload/fields - Set metadata fields.
pub async fn set_upload_fields(
    State(state): State<AppState>,
    Json(request): Json<UploadFieldsRequest>,
) -> ApiResult<UploadFormView> {
    let mut upload = state.upload.lock().await;
    if let Some(date) = request.document_date.as_deref() {
        upload.set_document_date(date)?;
    }
    if request.category.is_some() {
        upload.set_category(parse_category(request.category.as_deref())?);
    }
    if let Some(sub_category) = request.sub_category.as_deref() {
        upload.set_sub_category(sub_category)?;
    }
    if let Some(remarks) = request.remarks {
        upload.set_remarks(remarks);
    }
    success(upload.view())
}

/// POST /api/upload/file - Attach a file (multipart field `file`).
pub async fn attach_upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadFormView> {
    let mut attached = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
        attached = Some(UploadFile {
            name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let file = attached.ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;
    let mut upload = state.upload.lock().await;
    upload.set_file(file)?;
    success(upload.view())
}

/// POST /api/upload - Submit the upload.
pub async fn submit_upload(State(state): State<AppState>) -> ApiResult<UploadFormView> {
    let mut upload = state.upload.lock().await;
    upload.submit().await;
    success(upload.view())
}

/// DELETE /api/upload - Reset the upload form.
pub async fn clear_upload(State(state): State<AppState>) -> ApiResult<UploadFormView> {
    let mut upload = state.upload.lock().await;
    upload.reset();
    success(upload.view())
}
