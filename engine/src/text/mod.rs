//! Sentence-aware text chunking
//!
//! Splits source text into bounded, overlapping chunks that feed both the
//! embedding index and the frame encoder. Chunks carry char offsets back
//! into the source and a contiguous sequence number that doubles as the
//! frame number in the encoded container.

use anyhow::{bail, Result};
use std::collections::HashMap;

/// One bounded slice of source text. Immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Trimmed chunk text
    pub content: String,
    /// Char offset of `content` in the source string
    pub start_offset: usize,
    /// Char offset one past the end of `content` in the source string
    pub end_offset: usize,
    /// 0-based emission index within the parent text
    pub sequence_number: usize,
    /// Index of the parent message, when chunked through a coordinator
    pub parent_index: Option<usize>,
    /// Free-form string metadata
    pub metadata: HashMap<String, String>,
}

/// Splits text into ordered, possibly overlapping, sentence-aware chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap_size: usize,
    preserve_sentences: bool,
}

impl TextChunker {
    /// `chunk_size` is the proposed chunk length in chars; sentence
    /// preservation may stretch a chunk up to 1.5x that. `overlap_size`
    /// chars of each chunk's tail seed the next chunk's head.
    pub fn new(chunk_size: usize, overlap_size: usize, preserve_sentences: bool) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if overlap_size >= chunk_size {
            bail!(
                "overlap_size ({}) must be smaller than chunk_size ({})",
                overlap_size,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            overlap_size,
            preserve_sentences,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk `text`, tagging every chunk with the given parent index.
    pub fn chunk_with_parent(&self, text: &str, parent_index: Option<usize>) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        if len == 0 {
            return chunks;
        }

        let mut cursor = 0usize;
        loop {
            let mut end = (cursor + self.chunk_size).min(len);

            if self.preserve_sentences && end < len {
                // Stretch to the next sentence terminator plus trailing
                // whitespace, unless that blows the 1.5x budget.
                let mut probe = end;
                while probe < len && !is_sentence_terminator(chars[probe]) {
                    probe += 1;
                }
                if probe < len {
                    probe += 1;
                    while probe < len && chars[probe].is_whitespace() {
                        probe += 1;
                    }
                    if 2 * (probe - cursor) < 3 * self.chunk_size {
                        end = probe;
                    }
                }
            }

            // Trim in char space so offsets stay aligned with the source
            let mut start_trimmed = cursor;
            while start_trimmed < end && chars[start_trimmed].is_whitespace() {
                start_trimmed += 1;
            }
            let mut end_trimmed = end;
            while end_trimmed > start_trimmed && chars[end_trimmed - 1].is_whitespace() {
                end_trimmed -= 1;
            }

            if start_trimmed < end_trimmed {
                chunks.push(Chunk {
                    content: chars[start_trimmed..end_trimmed].iter().collect(),
                    start_offset: start_trimmed,
                    end_offset: end_trimmed,
                    sequence_number: chunks.len(),
                    parent_index,
                    metadata: HashMap::new(),
                });
            }

            if end >= len {
                break;
            }
            cursor = (cursor + 1).max(end.saturating_sub(self.overlap_size));
        }

        chunks
    }

    /// Chunk `text` with no parent association.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.chunk_with_parent(text, None)
    }
}

fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}
