use crate::config::settings::{GeminiConfig, PromptsConfig, PROMPT_TEXT_MARKER};
use crate::services::summarizer::ChunkSummarizer;
use crate::utils::error::ApiError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Gemini network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to parse Gemini response: {0}")]
    Malformed(String),

    #[error("Gemini returned no summary text")]
    Empty,
}

impl GeminiError {
    /// Rate limits, server errors and transport failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            GeminiError::Network(_) => true,
            GeminiError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            GeminiError::Malformed(_) | GeminiError::Empty => false,
        }
    }
}

impl From<GeminiError> for ApiError {
    fn from(err: GeminiError) -> Self {
        ApiError::LlmError(err.to_string())
    }
}

// Gemini's OpenAI-compatible chat completion surface
#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OpenAiMessage {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    config: GeminiConfig,
    summary_prompt: String,
}

impl GeminiService {
    pub fn new(config: GeminiConfig, prompts: &PromptsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create Gemini HTTP client")?;

        Ok(Self {
            client,
            config,
            summary_prompt: prompts.summary_prompt.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    pub fn build_prompt(&self, chunk: &str) -> String {
        self.summary_prompt.replace(PROMPT_TEXT_MARKER, chunk)
    }

    /// Single non-streaming completion, no retry.
    async fn complete_once(&self, prompt: &str) -> Result<String, GeminiError> {
        let request = OpenAiChatRequest {
            model: &self.config.model,
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status { status, body });
        }

        let body: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Malformed(e.to_string()))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GeminiError::Empty);
        }

        Ok(text)
    }

    /// Completion with exponential backoff on transient failures.
    pub async fn complete(&self, prompt: &str) -> Result<String, GeminiError> {
        let strategy =
            backoff_delays(self.config.retry_base_delay_ms, self.config.max_retries).map(jitter);

        RetryIf::spawn(
            strategy,
            || self.complete_once(prompt),
            |err: &GeminiError| {
                let retry = err.is_transient();
                if retry {
                    warn!("Transient Gemini failure, retrying: {}", err);
                }
                retry
            },
        )
        .await
    }
}

/// base, 2*base, 4*base, ... capped at `MAX_RETRY_DELAY`, one entry per retry.
fn backoff_delays(base_ms: u64, retries: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(base_ms.max(1))
        .map(|delay| (delay / 2).min(MAX_RETRY_DELAY))
        .take(retries)
}

#[async_trait]
impl ChunkSummarizer for GeminiService {
    async fn summarize_chunk(&self, chunk: &str) -> Result<String, ApiError> {
        debug!(
            "Requesting summary from {} for {} chars",
            self.config.model,
            chunk.chars().count()
        );

        let prompt = self.build_prompt(chunk);
        Ok(self.complete(&prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base_url: &str, max_retries: usize) -> GeminiService {
        let config = GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            max_retries,
            retry_base_delay_ms: 1,
            ..GeminiConfig::default()
        };
        GeminiService::new(config, &PromptsConfig::default()).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[test]
    fn test_build_prompt_embeds_chunk() {
        let svc = service("http://localhost", 0);
        let prompt = svc.build_prompt("Patient has a cough.");

        assert!(prompt.starts_with("You are a professional summarizer."));
        assert!(prompt.contains("TEXT:\nPatient has a cough.\n"));
        assert!(!prompt.contains(PROMPT_TEXT_MARKER));
    }

    #[test]
    fn test_transient_classification() {
        let status = |code: u16| GeminiError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        };

        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
        assert!(!GeminiError::Empty.is_transient());
    }

    #[test]
    fn test_backoff_starts_at_base_delay() {
        let delays: Vec<u128> = backoff_delays(500, 4).map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000]);

        let capped: Vec<Duration> = backoff_delays(20_000, 3).collect();
        assert_eq!(capped, vec![Duration::from_secs(20), MAX_RETRY_DELAY, MAX_RETRY_DELAY]);

        assert_eq!(backoff_delays(500, 0).count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_chunk_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "gemini-2.0-flash", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  - Point one\n- Point two \n")))
            .expect(1)
            .mount(&server)
            .await;

        let svc = service(&server.uri(), 0);
        let summary = svc.summarize_chunk("Some text.").await.unwrap();

        assert_eq!(summary, "- Point one\n- Point two");
    }

    #[tokio::test]
    async fn test_retries_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("- recovered")))
            .expect(1)
            .mount(&server)
            .await;

        let svc = service(&server.uri(), 3);
        let summary = svc.summarize_chunk("Some text.").await.unwrap();

        assert_eq!(summary, "- recovered");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .expect(3)
            .mount(&server)
            .await;

        let svc = service(&server.uri(), 2);
        let err = svc.summarize_chunk("Some text.").await.unwrap_err();

        match err {
            ApiError::LlmError(msg) => assert!(msg.contains("quota exceeded")),
            other => panic!("Expected LlmError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .expect(1)
            .mount(&server)
            .await;

        let svc = service(&server.uri(), 3);
        assert!(svc.summarize_chunk("Some text.").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_content_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let svc = service(&server.uri(), 3);
        let err = svc.complete("prompt").await.unwrap_err();
        assert!(matches!(err, GeminiError::Empty));
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let svc = service(&server.uri(), 0);
        let err = svc.complete("prompt").await.unwrap_err();
        assert!(matches!(err, GeminiError::Malformed(_)));
    }
}
