pub mod settings;

pub use settings::{
    GeminiConfig, LogFormat, LoggingConfig, PromptsConfig, ServerConfig, Settings,
    SummarizerConfig,
};
