use crate::document::{sanitize_filename, DocumentKind, DocumentParser};
use crate::state::AppState;
use crate::utils::error::ApiError;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

struct Upload {
    filename: String,
    data: Bytes,
}

/// Body-limit hits become 413, every other multipart failure is a bad request.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(format!("Failed to read upload: {}", err.body_text()))
    }
}

#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, ApiError> {
    info!("Summarize request received");

    let mut upload: Option<Upload> = None;

    // First `file` field wins; anything after it is left unread.
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        upload = Some(Upload { filename, data });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No file uploaded.".to_string()))?;

    if upload.filename.is_empty() {
        return Err(ApiError::BadRequest("No file selected.".to_string()));
    }

    let filename = sanitize_filename(&upload.filename);
    let kind = DocumentKind::from_filename(&filename)
        .ok_or_else(|| ApiError::BadRequest("Unsupported file type.".to_string()))?;

    info!("Processing upload: {} ({} bytes)", filename, upload.data.len());

    let timeout = Duration::from_secs(state.settings.server.request_timeout_seconds);
    let data = upload.data;

    // Dropping the future on timeout stops further chunk requests.
    let summary = tokio::time::timeout(timeout, async move {
        let parsed = tokio::task::spawn_blocking(move || DocumentParser::parse_bytes(&data, kind))
            .await
            .map_err(|e| ApiError::InternalError(format!("Parser task failed: {}", e)))?
            .map_err(|e| ApiError::ParseError(format!("Failed to parse document: {}", e)))?;

        if parsed.content.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "No text could be extracted from file.".to_string(),
            ));
        }

        info!(
            "Extracted {} characters (pages: {:?})",
            parsed.metadata.char_count, parsed.metadata.pages
        );

        state.pipeline.summarize_all(&parsed.content).await
    })
    .await
    .map_err(|_| {
        ApiError::RequestTimeout(format!(
            "Summarization did not finish within {} seconds",
            timeout.as_secs()
        ))
    })??;

    info!("Summary ready for {} ({} chars)", filename, summary.len());

    Ok(Json(SummaryResponse { summary }))
}
