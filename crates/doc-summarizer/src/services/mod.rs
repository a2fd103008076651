pub mod gemini;
pub mod summarizer;

pub use gemini::GeminiService;
pub use summarizer::{ChunkSummarizer, SummaryPipeline};
