use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub max_chunk_chars: usize,
    pub request_timeout_seconds: u64,
}

/// Liveness plus the summarization settings this instance runs with.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let settings = &state.settings;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: settings.gemini.model.clone(),
        max_chunk_chars: settings.summarizer.max_chunk_chars,
        request_timeout_seconds: settings.server.request_timeout_seconds,
    })
}
