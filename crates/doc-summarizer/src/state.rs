use crate::config::Settings;
use crate::services::SummaryPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub pipeline: SummaryPipeline,
}

impl AppState {
    pub fn new(settings: Settings, pipeline: SummaryPipeline) -> Self {
        Self { settings, pipeline }
    }
}
