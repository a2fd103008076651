pub mod chunker;
pub mod parser;

pub use chunker::TextChunker;
pub use parser::{sanitize_filename, DocumentKind, DocumentParser, ParsedDocument};
