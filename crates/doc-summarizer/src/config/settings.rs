use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder shipped in `config/settings.toml`; never a usable key.
const API_KEY_PLACEHOLDER: &str = "PASTE_YOUR_KEY_HERE";

/// Marker replaced by the chunk text when building the summary prompt.
pub const PROMPT_TEXT_MARKER: &str = "{{TEXT}}";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SummarizerConfig {
    /// Upper bound on chunk length, in characters.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible base url, without the trailing `/chat/completions`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptsConfig {
    #[serde(default = "default_summary_prompt")]
    pub summary_prompt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Daily-rotated log files go here; `None` logs to stdout only.
    #[serde(default = "default_log_directory")]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_max_upload_mb() -> usize {
    200
}

fn default_request_timeout() -> u64 {
    600
}

fn default_max_chunk_chars() -> usize {
    15_000 // adjust upward for bigger-context models
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_gemini_timeout() -> u64 {
    120
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_base_delay() -> u64 {
    500
}

fn default_summary_prompt() -> String {
    "You are a professional summarizer. Summarize the following text into short, factual bullet points.\n\
     If the text appears medical, organize bullets into Findings, Symptoms, Diagnosis, Treatment, Notes when relevant.\n\
     Be concise and factual. Return bullet points only.\n\
     \n\
     TEXT:\n\
     {{TEXT}}\n"
        .to_string()
}

fn default_log_level() -> String {
    "info,doc_summarizer=debug,tower_http=info".to_string()
}

fn default_log_directory() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

fn default_log_file_prefix() -> String {
    "summarizer".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            max_upload_mb: default_max_upload_mb(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_seconds: default_gemini_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            summary_prompt: default_summary_prompt(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            // Example: APP__GEMINI__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let key = self.gemini.api_key.trim();
        if key.is_empty() || key == API_KEY_PLACEHOLDER {
            anyhow::bail!(
                "Gemini API key is not configured (set APP__GEMINI__API_KEY or gemini.api_key)"
            );
        }

        if self.summarizer.max_chunk_chars == 0 {
            anyhow::bail!("summarizer.max_chunk_chars must be greater than zero");
        }

        if !self.prompts.summary_prompt.contains(PROMPT_TEXT_MARKER) {
            anyhow::bail!(
                "prompts.summary_prompt must contain the {} placeholder",
                PROMPT_TEXT_MARKER
            );
        }

        Ok(())
    }

    pub fn upload_limit_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }
}
