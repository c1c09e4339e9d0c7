#[cfg(test)]
mod tests;

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for fixed-size sliding-window chunking.
/// Both sizes are measured in characters, not bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum length of a chunk
    pub chunk_size: usize,
    /// Number of characters shared by adjacent chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 150,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("Overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
}

impl ChunkingConfig {
    /// Distance between the starts of two consecutive chunks
    #[inline]
    pub fn stride(&self) -> Result<usize, ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            });
        }
        Ok(self.chunk_size - self.overlap)
    }
}

/// Lazy iterator over the overlapping windows of a text.
///
/// Clone it before consuming to walk the same sequence again.
#[derive(Debug, Clone)]
pub struct TextChunks<'a> {
    text: &'a str,
    /// Byte offset of every character boundary, ending with `text.len()`
    boundaries: Vec<usize>,
    chunk_size: usize,
    stride: usize,
    /// Start of the next window, in characters
    start: usize,
    finished: bool,
}

/// Split `text` into windows of `chunk_size` characters, each sharing `overlap`
/// characters with its predecessor.
///
/// The window that reaches the end of the text is the last one emitted, so a text
/// of exactly `chunk_size` characters yields a single chunk. Empty text yields none.
#[inline]
pub fn chunk_text<'a>(
    text: &'a str,
    config: &ChunkingConfig,
) -> Result<TextChunks<'a>, ChunkingError> {
    let stride = config.stride()?;

    let boundaries = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();

    Ok(TextChunks {
        text,
        boundaries,
        chunk_size: config.chunk_size,
        stride,
        start: 0,
        finished: text.is_empty(),
    })
}

impl TextChunks<'_> {
    fn char_len(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    fn remaining(&self) -> usize {
        if self.finished {
            return 0;
        }
        let left = self.char_len().saturating_sub(self.start);
        if left <= self.chunk_size {
            1
        } else {
            1 + (left - self.chunk_size).div_ceil(self.stride)
        }
    }
}

impl<'a> Iterator for TextChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let char_len = self.char_len();
        let end = self.start.saturating_add(self.chunk_size).min(char_len);
        let from = *self.boundaries.get(self.start)?;
        let to = *self.boundaries.get(end)?;
        let chunk = self.text.get(from..to)?;

        if end == char_len {
            self.finished = true;
        } else {
            self.start += self.stride;
        }

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TextChunks<'_> {}

impl FusedIterator for TextChunks<'_> {}
