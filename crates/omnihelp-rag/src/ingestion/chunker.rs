//! Sentence-aware text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap carried into the next chunk
    overlap: usize,
    /// Chunks shorter than this are dropped
    min_size: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize, min_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size / 2),
            min_size,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap, config.min_chunk_size)
    }

    /// Split text into chunks of at most roughly `chunk_size` characters.
    ///
    /// Chunks break on sentence boundaries where possible; a sentence longer
    /// than a whole chunk is split on word boundaries instead.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in self.pieces(text) {
            if !current.is_empty() && current.len() + piece.len() > self.chunk_size {
                self.push_chunk(&mut chunks, &current);
                current = self.overlap_text(&current);
            }
            current.push_str(piece);
        }

        self.push_chunk(&mut chunks, &current);
        chunks
    }

    fn push_chunk(&self, chunks: &mut Vec<String>, text: &str) {
        let trimmed = text.trim();
        if trimmed.len() >= self.min_size {
            chunks.push(trimmed.to_string());
        }
    }

    /// Sentences, with over-long sentences broken into word runs
    fn pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if sentence.len() <= self.chunk_size {
                pieces.push(sentence);
                continue;
            }

            let mut start = 0;
            let mut end = 0;
            for (offset, word) in sentence.split_word_bound_indices() {
                let word_end = offset + word.len();
                if word_end - start > self.chunk_size && end > start {
                    pieces.push(&sentence[start..end]);
                    start = end;
                }
                end = word_end;
            }
            if end > start {
                pieces.push(&sentence[start..end]);
            }
        }
        pieces
    }

    /// Tail of a chunk to seed the next one
    fn overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        if text.len() <= self.overlap {
            return text.to_string();
        }

        let mut start = text.len() - self.overlap;
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        let tail = &text[start..];

        // Prefer starting at a sentence, then a word
        if let Some(pos) = tail.find(". ") {
            return tail[pos + 2..].to_string();
        }
        if let Some(pos) = tail.find(' ') {
            return tail[pos + 1..].to_string();
        }
        tail.to_string()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(1000, 200, 5);
        let chunks = chunker.chunk("Hold the reset button for 10 seconds.");
        assert_eq!(chunks, vec!["Hold the reset button for 10 seconds."]);
    }

    #[test]
    fn test_respects_sentence_bounds() {
        let chunker = TextChunker::new(40, 0, 1);
        let text = "The router has four ports. The reset button is on the back. Lights blink during updates.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "The router has four ports.");
        assert_eq!(chunks[1], "The reset button is on the back.");
        assert_eq!(chunks[2], "Lights blink during updates.");
    }

    #[test]
    fn test_overlap_carries_tail() {
        let chunker = TextChunker::new(60, 30, 1);
        let text = "First sentence is here. Second sentence follows it. Third one closes the text.";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() >= 2);
        assert!(chunks[1].contains("Second sentence"));
    }

    #[test]
    fn test_long_sentence_splits_on_words() {
        let chunker = TextChunker::new(20, 0, 1);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 20, "chunk too long: {:?}", chunk);
        }
        assert_eq!(chunks.join(" ").split_whitespace().count(), 11);
    }

    #[test]
    fn test_drops_tiny_chunks() {
        let chunker = TextChunker::new(1000, 200, 20);
        assert!(chunker.chunk("ok").is_empty());
        assert!(chunker.chunk("   \n  ").is_empty());
    }

    #[test]
    fn test_multibyte_overlap() {
        let chunker = TextChunker::new(30, 10, 1);
        let text = "Größe überprüfen bitte. Schließen Sie das Gerät an. Drücken Sie Ä.";
        let chunks = chunker.chunk(text);
        assert!(!chunks.is_empty());
    }
}
