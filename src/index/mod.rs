//! Exact nearest-neighbor vector index with co-persisted chunk metadata.
//!
//! The index is an immutable value: built offline, loaded once, and replaced
//! wholesale through [`SharedIndex`]. Vectors and chunk records are stored as
//! two co-located files that are only ever regenerated and swapped together.

mod builder;

pub use builder::{BuildError, BuildReport, DocumentOutcome, DocumentStatus, IndexBuilder};

use crate::chunker::Chunk;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// File holding the raw vectors
pub const VECTORS_FILE: &str = "vectors.bin";
/// File holding the ordered chunk records
pub const CHUNKS_FILE: &str = "chunks.json";

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index not found at {path}")]
    NotFound { path: String },

    #[error("Corrupt index at {path}: {message}")]
    Corrupted { path: String, message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// On-disk layout of the vector blob
#[derive(Serialize, Deserialize)]
struct VectorBlob {
    dimension: usize,
    count: usize,
    data: Vec<f32>,
}

/// Immutable flat index: all chunk vectors plus the ordered chunk records.
///
/// Search is an exact scan under squared Euclidean distance. Internal
/// position (insertion order) breaks distance ties, so results are
/// deterministic for identical input.
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Assemble an index from parallel vector and chunk sequences.
    ///
    /// Every vector must have `dimension` entries and pair 1:1 with a chunk
    /// record; the sequences' shared order becomes the internal position.
    pub fn build(
        dimension: usize,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<Chunk>,
    ) -> Result<Self, IndexError> {
        if vectors.len() != chunks.len() {
            return Err(IndexError::Corrupted {
                path: "(in-memory)".to_string(),
                message: format!(
                    "{} vectors but {} chunk records",
                    vectors.len(),
                    chunks.len()
                ),
            });
        }

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self {
            dimension,
            vectors: data,
            chunks,
        })
    }

    /// Index with no content; searches return nothing.
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Chunk record at an internal position returned by [`Self::search`]
    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    /// Exact k-nearest-neighbor scan.
    ///
    /// Returns up to `k` `(position, squared_distance)` pairs ordered by
    /// ascending distance, ties broken by lowest position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| {
                let distance: f32 = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (position, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Persist vectors and chunk records as two co-located files.
    ///
    /// Both files are written to temporary names and renamed into place only
    /// after both writes succeed, so a crash never leaves a mixed pair.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        std::fs::create_dir_all(dir).map_err(|e| IndexError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let blob = VectorBlob {
            dimension: self.dimension,
            count: self.chunks.len(),
            data: self.vectors.clone(),
        };
        let blob_bytes =
            bincode::serialize(&blob).map_err(|e| IndexError::Serialization(e.to_string()))?;
        let chunk_bytes = serde_json::to_vec(&self.chunks)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;

        let vectors_tmp = dir.join(format!("{}.tmp", VECTORS_FILE));
        let chunks_tmp = dir.join(format!("{}.tmp", CHUNKS_FILE));

        std::fs::write(&vectors_tmp, blob_bytes).map_err(|e| IndexError::Io {
            path: vectors_tmp.display().to_string(),
            source: e,
        })?;
        std::fs::write(&chunks_tmp, chunk_bytes).map_err(|e| IndexError::Io {
            path: chunks_tmp.display().to_string(),
            source: e,
        })?;

        std::fs::rename(&vectors_tmp, dir.join(VECTORS_FILE)).map_err(|e| IndexError::Io {
            path: vectors_tmp.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&chunks_tmp, dir.join(CHUNKS_FILE)).map_err(|e| IndexError::Io {
            path: chunks_tmp.display().to_string(),
            source: e,
        })?;

        tracing::info!(
            "Saved index with {} chunks ({}D) to {}",
            self.chunks.len(),
            self.dimension,
            dir.display()
        );
        Ok(())
    }

    /// Load a previously saved index, refusing any inconsistent pair.
    ///
    /// A chunk-record count that differs from the vector count means the two
    /// files were not written together; that is corruption, never a silent
    /// truncation.
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        if !vectors_path.exists() || !chunks_path.exists() {
            return Err(IndexError::NotFound {
                path: dir.display().to_string(),
            });
        }

        let blob_bytes = std::fs::read(&vectors_path).map_err(|e| IndexError::Io {
            path: vectors_path.display().to_string(),
            source: e,
        })?;
        let blob: VectorBlob = bincode::deserialize(&blob_bytes).map_err(|e| {
            IndexError::Corrupted {
                path: vectors_path.display().to_string(),
                message: format!("unreadable vector blob: {}", e),
            }
        })?;

        if blob.data.len() != blob.count * blob.dimension {
            return Err(IndexError::Corrupted {
                path: vectors_path.display().to_string(),
                message: format!(
                    "blob claims {} vectors of {}D but holds {} values",
                    blob.count,
                    blob.dimension,
                    blob.data.len()
                ),
            });
        }

        let chunk_bytes = std::fs::read(&chunks_path).map_err(|e| IndexError::Io {
            path: chunks_path.display().to_string(),
            source: e,
        })?;
        let chunks: Vec<Chunk> =
            serde_json::from_slice(&chunk_bytes).map_err(|e| IndexError::Corrupted {
                path: chunks_path.display().to_string(),
                message: format!("unreadable chunk records: {}", e),
            })?;

        if chunks.len() != blob.count {
            return Err(IndexError::Corrupted {
                path: dir.display().to_string(),
                message: format!(
                    "{} vectors but {} chunk records",
                    blob.count,
                    chunks.len()
                ),
            });
        }

        tracing::info!(
            "Loaded index with {} chunks ({}D) from {}",
            chunks.len(),
            blob.dimension,
            dir.display()
        );

        Ok(Self {
            dimension: blob.dimension,
            vectors: blob.data,
            chunks,
        })
    }
}

/// Process-wide handle to the current index.
///
/// Readers take an `Arc` snapshot and search against it; a rebuild installs
/// a new index with one swap. In-flight searches keep the snapshot they
/// captured, so they see either the old or the new index, never a mix.
pub struct SharedIndex {
    current: RwLock<Option<Arc<VectorIndex>>>,
}

impl SharedIndex {
    /// Handle with no index loaded (the "no knowledge base" state)
    pub fn unloaded() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(index))),
        }
    }

    /// Snapshot of the current index, if one is loaded
    pub fn current(&self) -> Option<Arc<VectorIndex>> {
        self.current.read().unwrap().clone()
    }

    /// Atomically replace the index; existing snapshots stay valid
    pub fn install(&self, index: VectorIndex) {
        let mut guard = self.current.write().unwrap();
        *guard = Some(Arc::new(index));
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::unloaded()
    }
}
