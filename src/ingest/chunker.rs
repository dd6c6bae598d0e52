use crate::config::ChunkingConfig;

/// Splits raw document text into bounded-size, sentence-respecting segments.
///
/// Sentences are never split: a single sentence longer than the limit still
/// forms its own chunk. The trade-off is readability of chunks over exactness
/// of the size bound.
pub struct SentenceChunker {
    max_chunk_chars: usize,
}

impl SentenceChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            max_chunk_chars: config.max_chunk_chars,
        }
    }

    /// Split text into ordered chunks.
    ///
    /// Internal newlines are normalized to spaces and `". "` is treated as the
    /// sentence boundary. Sentences are greedily accumulated while the
    /// cumulative character count stays within the limit; each sentence is
    /// terminated with a period even when the source text had none. The last
    /// accumulating chunk is emitted even if it never reached the limit.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = text.replace('\n', " ");

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut size = 0usize;

        for raw in normalized.split(". ") {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let sentence = if trimmed.ends_with('.') {
                trimmed.to_string()
            } else {
                format!("{}.", trimmed)
            };

            if size + sentence.len() > self.max_chunk_chars && !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
                size = 0;
            }

            size += sentence.len();
            current.push(sentence);
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_chunk_chars: usize) -> SentenceChunker {
        SentenceChunker::new(&ChunkingConfig { max_chunk_chars })
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunker(500).split("").is_empty());
        assert!(chunker(500).split("   \n  ").is_empty());
    }

    #[test]
    fn test_single_sentence() {
        let chunks = chunker(500).split("Remote work requires two in-office days.");
        assert_eq!(chunks, vec!["Remote work requires two in-office days."]);
    }

    #[test]
    fn test_missing_terminal_period_is_added() {
        let chunks = chunker(500).split("No period here");
        assert_eq!(chunks, vec!["No period here."]);
    }

    #[test]
    fn test_newlines_normalized() {
        let chunks = chunker(500).split("First\nline. Second\nline.");
        assert_eq!(chunks, vec!["First line. Second line."]);
    }

    #[test]
    fn test_greedy_packing_respects_limit() {
        // Each sentence is 10 chars; two fit in 25, the third starts a new chunk.
        let text = "aaaaaaaaa. bbbbbbbbb. ccccccccc.";
        let chunks = chunker(25).split(text);
        assert_eq!(chunks, vec!["aaaaaaaaa. bbbbbbbbb.", "ccccccccc."]);
        for chunk in &chunks {
            assert!(chunk.len() <= 25 || !chunk.contains(". "));
        }
    }

    #[test]
    fn test_overlong_sentence_forms_own_chunk() {
        let long = "x".repeat(80);
        let text = format!("short one. {}. tail.", long);
        let chunks = chunker(20).split(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "short one.");
        assert_eq!(chunks[1], format!("{}.", long));
        assert_eq!(chunks[2], "tail.");
    }

    #[test]
    fn test_content_preserving() {
        let text = "One fish. Two fish. Red fish. Blue fish.";
        let chunks = chunker(18).split(text);
        let rejoined = chunks.join(" ");
        let original: Vec<&str> = text.split(". ").collect();
        for sentence in original {
            let sentence = sentence.trim_end_matches('.');
            assert!(rejoined.contains(sentence), "missing sentence: {sentence}");
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma. Delta epsilon. Zeta eta theta iota. Kappa.";
        let a = chunker(30).split(text);
        let b = chunker(30).split(text);
        assert_eq!(a, b);
    }
}
