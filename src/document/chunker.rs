use serde::Serialize;

use crate::error::{Error, Result};

/// A contiguous slice of a document. Offsets are in chars, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits text into overlapping chunks, preferring to cut after a sentence
/// terminator or newline found inside the overlap window.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be greater than zero".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.spans(text).into_iter().map(|c| c.text).collect()
    }

    pub fn spans(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();

        if len <= self.chunk_size {
            return vec![Chunk {
                start: 0,
                end: len,
                text: text.to_string(),
            }];
        }

        let mut bounds: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;

        loop {
            let remaining = len - start;

            // Fold a short tail into the previous chunk
            if remaining * 2 < self.chunk_size {
                if let Some(last) = bounds.last_mut() {
                    last.1 = len;
                    break;
                }
            }

            let hard_end = (start + self.chunk_size).min(len);
            if hard_end == len {
                bounds.push((start, len));
                break;
            }

            let end = self.soft_boundary(&chars, start, hard_end).unwrap_or(hard_end);
            bounds.push((start, end));
            start = end - self.overlap;
        }

        // Byte offset of every char boundary, including the end of the text
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        bounds
            .into_iter()
            .map(|(s, e)| Chunk {
                start: s,
                end: e,
                text: text[offsets[s]..offsets[e]].to_string(),
            })
            .collect()
    }

    /// Last cut position inside `[hard_end - overlap, hard_end]` that falls
    /// just after ". " or a newline.
    fn soft_boundary(&self, chars: &[char], start: usize, hard_end: usize) -> Option<usize> {
        let window_start = hard_end.saturating_sub(self.overlap).max(start);

        let cut = (window_start + 1..=hard_end).rev().find(|&pos| {
            chars[pos - 1] == '\n'
                || (pos >= window_start + 2 && chars[pos - 2] == '.' && chars[pos - 1] == ' ')
        })?;

        // The next chunk must still start after this one
        (cut > start + self.overlap).then_some(cut)
    }
}
