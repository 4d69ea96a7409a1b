//! Boundary-aware document chunking.
//!
//! Text is cut into windows of `chunk_size` characters. A window that ends
//! inside the text is stretched forward to the next space or newline so
//! words are not split, and consecutive windows share `overlap` characters.
//! All offsets are counted in characters, never bytes, so multi-byte text
//! is never cut inside a code point.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// A chunk of text extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning document.
    pub doc_id: String,

    /// Position among the document's emitted chunks (0-based).
    pub chunk_index: usize,

    /// The trimmed chunk text. Never empty.
    pub text: String,

    /// Length of `text` in characters.
    pub char_length: usize,

    /// Length of `text` in bytes.
    pub byte_length: usize,
}

/// Splits text into overlapping, word-aligned chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. `overlap` must be smaller than a non-zero
    /// `chunk_size`, otherwise windows could stop advancing.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RetrievalError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RetrievalError::Configuration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Character ranges of every window, before trimming.
    ///
    /// Consecutive ranges overlap or touch, so together they cover the whole
    /// text.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_of(&chars)
    }

    fn spans_of(&self, chars: &[char]) -> Vec<Range<usize>> {
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);
            while end < len && !matches!(chars[end], ' ' | '\n') {
                end += 1;
            }
            spans.push(start..end);

            if end >= len {
                break;
            }
            // end >= start + chunk_size > start + overlap, so this advances.
            start = end - self.overlap;
        }

        spans
    }

    /// Split `text` into trimmed, non-empty chunk texts.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        // Byte offset of every character, plus the end of the text.
        let byte_offsets: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();

        self.spans_of(&chars)
            .into_iter()
            .filter_map(|span| {
                let window = &text[byte_offsets[span.start]..byte_offsets[span.end]];
                let trimmed = window.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }

    /// Split `text` into [`Chunk`] records owned by `doc_id`.
    pub fn chunk_document(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Chunk {
                doc_id: doc_id.to_string(),
                chunk_index,
                char_length: text.chars().count(),
                byte_length: text.len(),
                text,
            })
            .collect()
    }
}
