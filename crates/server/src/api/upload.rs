//! Document upload endpoint.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use docqa_core::truncate_chars;
use docqa_ingest::{DocumentKind, ExtractionError};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::uploads::UploadedFile;

use super::{api_error, ApiError};

const FILE_FIELD: &str = "file";
const PROCESSING_FAILED: &str = "Failed to process uploaded file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    /// Name the file was stored under.
    pub filename: String,
    /// Extracted text, capped to the upload content budget.
    pub content: String,
}

fn multipart_error(e: MultipartError) -> ApiError {
    // Body limit overruns surface here as 413.
    api_error(e.status(), e.body_text())
}

// ── POST /upload ─────────────────────────────────────────────────

/// Accepts multipart/form-data with a `file` part (`.txt` or `.pdf`).
///
/// The file is validated before anything touches disk, stored under its
/// sanitized name, and its text returned to the client. The server keeps no
/// record of the upload beyond the stored file.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected non-multipart upload: {}", e);
        api_error(StatusCode::BAD_REQUEST, "No file part")
    })?;

    // Other form fields before the file part are skipped.
    let field = loop {
        match multipart.next_field().await.map_err(multipart_error)? {
            Some(field) if field.name() == Some(FILE_FIELD) => break field,
            Some(_) => continue,
            None => return Err(api_error(StatusCode::BAD_REQUEST, "No file part")),
        }
    };

    // A part without a filename parameter is a plain form value, not a file.
    let original = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No file part"))?;
    if original.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No selected file"));
    }
    let kind = DocumentKind::from_filename(&original)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Invalid file type"))?;

    let bytes = field.bytes().await.map_err(multipart_error)?;
    let file = UploadedFile::new(original, kind, bytes);

    let upload_id = Uuid::new_v4();
    info!(
        "[{}] Upload '{}' stored as '{}' ({}, {} bytes)",
        upload_id,
        file.original_name,
        file.stored_name,
        file.kind,
        file.bytes.len()
    );

    let stored = state.uploads.store(&file).await.map_err(|e| {
        error!("[{}] Failed to store upload: {}", upload_id, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
    })?;

    // The guard moves into the task so the sweeper skips the file for as
    // long as extraction reads it.
    let extracted = tokio::task::spawn_blocking(move || docqa_ingest::extract_file(stored.path(), kind))
        .await
        .map_err(|e| {
            error!("[{}] Extraction task failed: {}", upload_id, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
        })?
        .map_err(|e| extraction_error(upload_id, e))?;

    let text = extracted.full_text();
    let content = truncate_chars(&text, state.limits.upload_content_max_chars);
    info!(
        "[{}] Extracted {} page(s), returning {} of {} chars",
        upload_id,
        extracted.pages.len(),
        content.chars().count(),
        text.chars().count()
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        filename: file.stored_name,
        content: content.to_string(),
    }))
}

fn extraction_error(upload_id: Uuid, e: ExtractionError) -> ApiError {
    if e.is_content_error() {
        warn!("[{}] Unreadable document: {}", upload_id, e);
        api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else {
        error!("[{}] Extraction I/O failure: {}", upload_id, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
    }
}
