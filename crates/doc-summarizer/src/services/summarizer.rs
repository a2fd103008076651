use crate::config::SummarizerConfig;
use crate::document::TextChunker;
use crate::utils::error::ApiError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Turns one chunk of document text into a bullet-point summary.
#[async_trait]
pub trait ChunkSummarizer: Send + Sync {
    async fn summarize_chunk(&self, chunk: &str) -> Result<String, ApiError>;
}

/// Chunk -> summarize each chunk in order -> labeled concatenation.
#[derive(Clone)]
pub struct SummaryPipeline {
    chunker: TextChunker,
    summarizer: Arc<dyn ChunkSummarizer>,
}

impl SummaryPipeline {
    pub fn new(config: &SummarizerConfig, summarizer: Arc<dyn ChunkSummarizer>) -> Self {
        Self {
            chunker: TextChunker::new(config.max_chunk_chars),
            summarizer,
        }
    }

    /// Summarize `text` chunk by chunk.
    ///
    /// Chunks are sent one at a time, in document order. The first failing
    /// chunk aborts the whole call and its error is returned as-is; nothing
    /// produced so far is kept.
    pub async fn summarize_all(&self, text: &str) -> Result<String, ApiError> {
        let chunks = self.chunker.chunk(text);
        let total = chunks.len();

        if total == 0 {
            debug!("No chunks to summarize");
            return Ok(String::new());
        }

        info!("Summarizing {} chunks", total);
        let started = Instant::now();

        let mut parts = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let part = i + 1;
            debug!("Summarizing part {}/{} ({} chars)", part, total, chunk.chars().count());

            let summary = self.summarizer.summarize_chunk(chunk).await?;
            parts.push(format!("### Summary Part {}:\n{}", part, summary));
        }

        info!(
            "Summarized {} chunks in {} ms",
            total,
            started.elapsed().as_millis()
        );

        Ok(parts.join("\n\n"))
    }
}
