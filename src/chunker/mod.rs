//! Sliding-window document chunking with stable chunk identity

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Invalid window configuration: window {window}, overlap {overlap}")]
    InvalidWindow { window: usize, overlap: usize },
}

/// A bounded-length slice of a source document, the unit of retrieval.
///
/// `chunk_id` is derived from the document identity and the chunk's start
/// offset, so re-chunking unchanged text reproduces identical ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_ref: String,
    pub text: String,
    /// Start position in the document, counted in characters
    pub start_offset: usize,
}

/// Splits extracted text into overlapping fixed-size character windows.
#[derive(Debug, Clone)]
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker with a window of `window` characters, consecutive
    /// windows overlapping by `overlap` characters. Requires `overlap < window`.
    pub fn new(window: usize, overlap: usize) -> Result<Self, ChunkError> {
        if window == 0 || overlap >= window {
            return Err(ChunkError::InvalidWindow { window, overlap });
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks attributed to `document_ref`.
    ///
    /// Windows advance by `window - overlap` characters; the final chunk may
    /// be shorter than the window (no padding). Text shorter than one window
    /// yields exactly one chunk holding the full text. Empty text yields no
    /// chunks. Offsets and lengths are counted in characters so multi-byte
    /// UTF-8 never splits.
    pub fn chunk(&self, document_ref: &str, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte boundary of every character, plus the end of the text, so a
        // character window maps onto a byte range.
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        bounds.push(text.len());
        let total_chars = bounds.len() - 1;

        let step = self.window - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = usize::min(start + self.window, total_chars);
            let slice = &text[bounds[start]..bounds[end]];
            chunks.push(Chunk {
                chunk_id: chunk_id(document_ref, start),
                document_ref: document_ref.to_string(),
                text: slice.to_string(),
                start_offset: start,
            });
            if end == total_chars {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Stable chunk identity: hash of the document identity and start offset.
fn chunk_id(document_ref: &str, start_offset: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(document_ref.as_bytes());
    hasher.update(b":");
    hasher.update(start_offset.to_le_bytes().as_slice());
    let hash = hasher.finalize();
    hash.to_hex()[..16].to_string()
}
