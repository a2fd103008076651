use crate::utils::error::ApiError;
use axum::{
    extract::rejection::JsonRejection,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, info};

pub const DOWNLOAD_FILENAME: &str = "summary.txt";

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub summary: Option<String>,
}

/// Return a summary as a plain-text attachment.
pub async fn download_handler(
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let summary = payload
        .map_err(|e| debug!("Rejected download body: {}", e))
        .ok()
        .and_then(|Json(request)| request.summary)
        .ok_or_else(|| ApiError::BadRequest("No summary provided".to_string()))?;

    info!("Serving summary download ({} bytes)", summary.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILENAME),
            ),
        ],
        summary,
    )
        .into_response())
}
