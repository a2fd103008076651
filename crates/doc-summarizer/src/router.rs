use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, TraceLayer},
};

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.settings.server.static_dir.clone();
    let upload_limit = state.settings.upload_limit_bytes();

    let api_routes = Router::new()
        .route("/summarize", post(handlers::summarize::summarize_handler))
        .route("/download", post(handlers::download::download_handler))
        .route("/health", get(handlers::health::health_check))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        // Upload page
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CatchPanicLayer::new())
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        // Body limit (uploads, default 200MB)
        .layer(DefaultBodyLimit::max(upload_limit))
}
