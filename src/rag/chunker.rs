use crate::types::{AppError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 900;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Fixed-size sliding-window chunker.
///
/// Sizes are counted in characters, so a window never splits a multi-byte
/// code point. Consecutive windows share `chunk_overlap` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidInput(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the string.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = boundaries.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < n {
            let end = (start + self.chunk_size).min(n);
            let window = text[boundaries[start]..boundaries[end]].trim();
            if !window.is_empty() {
                chunks.push(window.to_string());
            }

            if end == n {
                break;
            }

            start = end.saturating_sub(self.chunk_overlap);
        }

        chunks
    }
}
