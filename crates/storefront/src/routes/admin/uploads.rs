//! `POST /api/admin/upload`: multipart image upload.
//!
//! Fields: `file` (required) and `sizePreference` (optional, echoed back).
//! The file is streamed chunk by chunk and refused as soon as it passes the
//! size limit, so an oversized body is never fully buffered or written.

use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{Field, MultipartRejection},
    },
    routing::post,
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::RequireAdmin;
use crate::services::uploads::{IncomingFile, StoredUpload, UploadError, Uploader};
use crate::state::AppState;

/// Room for multipart boundaries and the other form fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD))
}

fn multipart_error(uploader: &Uploader, err: &axum::extract::multipart::MultipartError) -> UploadError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        uploader.too_large()
    } else {
        UploadError::Malformed(err.body_text())
    }
}

/// Read the file field, refusing disallowed types before reading the body.
async fn read_file(
    uploader: &Uploader,
    mut field: Field<'_>,
) -> std::result::Result<IncomingFile, UploadError> {
    let original_name = field.file_name().map(str::to_owned);
    let content_type = field
        .content_type()
        .map(str::to_owned)
        .unwrap_or_default();
    uploader.validate(&content_type, 0)?;

    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(uploader, &e))?
    {
        if bytes.len() + chunk.len() > uploader.max_bytes() {
            return Err(uploader.too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(IncomingFile {
        original_name,
        content_type,
        bytes,
    })
}

#[instrument(skip(state, multipart), fields(admin_id = %admin.id))]
async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<StoredUpload>> {
    let mut multipart = multipart?;
    let uploader = state.uploader();

    let mut file = None;
    let mut size_preference = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(uploader, &e))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") if file.is_none() => file = Some(read_file(uploader, field).await?),
            Some("sizePreference") => {
                let text = field.text().await.map_err(|e| multipart_error(uploader, &e))?;
                size_preference = Some(text.trim().to_owned()).filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let file = file.ok_or(UploadError::MissingFile)?;
    let stored = uploader.store(file, size_preference).await.map_err(AppError::from)?;
    Ok(Json(stored))
}
