use tracing::debug;

/// Cuts at a sentence end only when the chunk keeps at least this share of `max_chars`.
const SENTENCE_CUT_THRESHOLD: f64 = 0.6;

const SENTENCE_TERMINATOR: char = '.';

/// Splits text into chunks of at most `max_chars` characters, preferring to
/// cut right after a sentence terminator.
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_chars: usize,
}

impl TextChunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Shortest chunk (in chars) that may end at a sentence terminator.
    fn min_sentence_cut(&self) -> usize {
        (self.max_chars as f64 * SENTENCE_CUT_THRESHOLD) as usize
    }

    /// Chunk text into trimmed, non-empty pieces in document order.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut remaining = text.trim();
        let mut chunks = Vec::new();

        if remaining.is_empty() {
            return chunks;
        }

        let min_cut = self.min_sentence_cut();

        // `nth(max_chars)` exists only while more than `max_chars` chars remain;
        // its byte offset is the end of the first `max_chars` chars.
        while let Some((window_end, _)) = remaining.char_indices().nth(self.max_chars) {
            let window = &remaining[..window_end];

            let cut = match window.rfind(SENTENCE_TERMINATOR) {
                Some(pos) if window[..pos].chars().count() >= min_cut => {
                    pos + SENTENCE_TERMINATOR.len_utf8()
                }
                _ => window_end,
            };

            chunks.push(remaining[..cut].trim().to_string());
            remaining = remaining[cut..].trim();
        }

        if !remaining.is_empty() {
            chunks.push(remaining.to_string());
        }

        debug!(
            "Created {} chunks (max {} chars)",
            chunks.len(),
            self.max_chars
        );

        chunks
    }
}
