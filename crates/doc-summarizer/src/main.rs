use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use doc_summarizer::{build_router, AppState, GeminiService, Settings, SummaryPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    let _log_guard = doc_summarizer::utils::logger::init_logger(&settings.logging)?;

    info!("🚀 Starting Document Summarizer...");
    info!(
        "✅ Configuration loaded (model: {}, max chunk: {} chars)",
        settings.gemini.model, settings.summarizer.max_chunk_chars
    );

    let gemini = Arc::new(GeminiService::new(
        settings.gemini.clone(),
        &settings.prompts,
    )?);
    let pipeline = SummaryPipeline::new(&settings.summarizer, gemini);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    let app = build_router(Arc::new(AppState::new(settings, pipeline)));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
