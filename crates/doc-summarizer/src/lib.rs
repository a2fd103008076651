pub mod config;
pub mod document;
pub mod handlers;
pub mod router;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Settings;
pub use router::build_router;
pub use services::{ChunkSummarizer, GeminiService, SummaryPipeline};
pub use state::AppState;
pub use utils::error::ApiError;
