//! Offline index construction from a document corpus

use crate::chunker::{Chunk, Chunker};
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::extract::TextExtractor;
use crate::index::{IndexError, VectorIndex};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

#[derive(Error, Debug)]
pub enum BuildError {
    /// Embedding backend failure aborts the whole batch; the report records
    /// which documents had already succeeded.
    #[error("Embedding backend failed during build: {source}")]
    Embedding {
        source: EmbeddingError,
        report: BuildReport,
    },

    #[error("Failed to scan corpus directory {path}: {message}")]
    CorpusScan { path: PathBuf, message: String },

    #[error("Failed to assemble index: {0}")]
    Assembly(#[from] IndexError),
}

/// Per-document result of one build run
#[derive(Debug, Clone)]
pub enum DocumentStatus {
    Indexed { chunks: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub status: DocumentStatus,
}

/// Aggregated operator-facing outcome of a build run
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub outcomes: Vec<DocumentOutcome>,
    pub total_chunks: usize,
    pub built_at: DateTime<Utc>,
}

impl BuildReport {
    pub fn indexed_documents(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DocumentStatus::Indexed { .. }))
            .count()
    }

    pub fn skipped_documents(&self) -> usize {
        self.outcomes.len() - self.indexed_documents()
    }
}

/// Runs the offline ingestion pipeline: scan corpus, extract, chunk, embed,
/// assemble the flat index.
///
/// Unreadable documents are skipped and reported; an embedding backend
/// failure aborts the batch. Chunk order within a document follows document
/// order regardless of embedding batch boundaries, so positions (and ids)
/// are stable across rebuilds of unchanged input.
pub struct IndexBuilder {
    extractor: Box<dyn TextExtractor>,
    provider: Arc<dyn EmbeddingProvider>,
    chunker: Chunker,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        provider: Arc<dyn EmbeddingProvider>,
        chunker: Chunker,
        batch_size: usize,
    ) -> Self {
        Self {
            extractor,
            provider,
            chunker,
            batch_size: batch_size.max(1),
        }
    }

    /// Build an index over every supported document under `corpus_dir`.
    pub fn build(&self, corpus_dir: &Path) -> Result<(VectorIndex, BuildReport), BuildError> {
        let documents = self.scan_corpus(corpus_dir)?;
        tracing::info!(
            "Building index from {} documents in {}",
            documents.len(),
            corpus_dir.display()
        );

        let mut outcomes = Vec::new();
        let mut all_chunks: Vec<Chunk> = Vec::new();
        let mut all_vectors: Vec<Vec<f32>> = Vec::new();

        for path in documents {
            let document_ref = document_ref(corpus_dir, &path);

            let text = match self.extractor.extract(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    outcomes.push(DocumentOutcome {
                        path,
                        status: DocumentStatus::Skipped {
                            reason: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let chunks = self.chunker.chunk(&document_ref, &text);
            if chunks.is_empty() {
                outcomes.push(DocumentOutcome {
                    path,
                    status: DocumentStatus::Skipped {
                        reason: "document produced no chunks".to_string(),
                    },
                });
                continue;
            }

            match self.embed_chunks(&chunks) {
                Ok(vectors) => {
                    tracing::debug!(
                        "Indexed {} ({} chunks)",
                        path.display(),
                        chunks.len()
                    );
                    outcomes.push(DocumentOutcome {
                        path,
                        status: DocumentStatus::Indexed {
                            chunks: chunks.len(),
                        },
                    });
                    all_vectors.extend(vectors);
                    all_chunks.extend(chunks);
                }
                Err(source) => {
                    outcomes.push(DocumentOutcome {
                        path,
                        status: DocumentStatus::Skipped {
                            reason: format!("embedding failed: {}", source),
                        },
                    });
                    let total_chunks = all_chunks.len();
                    return Err(BuildError::Embedding {
                        source,
                        report: BuildReport {
                            outcomes,
                            total_chunks,
                            built_at: Utc::now(),
                        },
                    });
                }
            }
        }

        let report = BuildReport {
            total_chunks: all_chunks.len(),
            outcomes,
            built_at: Utc::now(),
        };

        let index = VectorIndex::build(self.provider.dimension(), all_vectors, all_chunks)?;

        tracing::info!(
            "Index build complete: {} documents indexed, {} skipped, {} chunks",
            report.indexed_documents(),
            report.skipped_documents(),
            report.total_chunks
        );

        Ok((index, report))
    }

    /// Embed a document's chunks in order, batching for throughput.
    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            vectors.extend(self.provider.embed_batch(&texts)?);
        }
        Ok(vectors)
    }

    /// Supported documents under the corpus root, sorted for determinism.
    fn scan_corpus(&self, corpus_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
        if !corpus_dir.is_dir() {
            return Err(BuildError::CorpusScan {
                path: corpus_dir.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(corpus_dir).follow_links(true) {
            let entry = entry.map_err(|e| BuildError::CorpusScan {
                path: corpus_dir.to_path_buf(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let supported = entry
                .path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if supported {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Document identity used in chunk ids and citations: the path relative to
/// the corpus root, so moving the corpus does not change identities.
fn document_ref(corpus_dir: &Path, path: &Path) -> String {
    path.strip_prefix(corpus_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedNgramProvider;
    use crate::extract::DocumentExtractor;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_doc(dir: &Path, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        write!(file, "{}", content).unwrap();
    }

    fn builder(batch_size: usize) -> IndexBuilder {
        IndexBuilder::new(
            Box::new(DocumentExtractor::new()),
            Arc::new(HashedNgramProvider::new(64).unwrap()),
            Chunker::new(40, 10).unwrap(),
            batch_size,
        )
    }

    #[test]
    fn test_build_indexes_supported_documents() {
        let temp = TempDir::new().unwrap();
        write_doc(
            temp.path(),
            "family.txt",
            "Divorce petitions are filed before the family court with grounds attached.",
        );
        write_doc(
            temp.path(),
            "rent.md",
            "A landlord must serve written notice before seeking eviction of a tenant.",
        );
        write_doc(temp.path(), "ignored.docx", "not a corpus format");

        let (index, report) = builder(8).build(temp.path()).unwrap();
        assert_eq!(report.indexed_documents(), 2);
        assert_eq!(report.skipped_documents(), 0);
        assert_eq!(index.len(), report.total_chunks);
        assert!(index.len() >= 2);
    }

    #[test]
    fn test_unreadable_document_is_skipped_not_fatal() {
        let temp = TempDir::new().unwrap();
        write_doc(temp.path(), "good.txt", "Consumer protection applies to online sales.");
        write_doc(temp.path(), "empty.txt", "");

        let (index, report) = builder(8).build(temp.path()).unwrap();
        assert_eq!(report.indexed_documents(), 1);
        assert_eq!(report.skipped_documents(), 1);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_empty_corpus_builds_empty_index() {
        let temp = TempDir::new().unwrap();
        let (index, report) = builder(8).build(temp.path()).unwrap();
        assert!(index.is_empty());
        assert_eq!(report.outcomes.len(), 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let temp = TempDir::new().unwrap();
        write_doc(
            temp.path(),
            "labour.txt",
            "Wrongful termination claims must be raised within the limitation period.",
        );

        let b = builder(2);
        let (first, _) = b.build(temp.path()).unwrap();
        let (second, _) = b.build(temp.path()).unwrap();

        assert_eq!(first.len(), second.len());
        for position in 0..first.len() {
            assert_eq!(first.chunk(position), second.chunk(position));
        }
    }

    #[test]
    fn test_batch_boundaries_do_not_reorder_chunks() {
        let temp = TempDir::new().unwrap();
        write_doc(
            temp.path(),
            "long.txt",
            &"The registrar records every transfer deed in sequence. ".repeat(20),
        );

        let (small_batches, _) = builder(1).build(temp.path()).unwrap();
        let (large_batches, _) = builder(64).build(temp.path()).unwrap();

        assert_eq!(small_batches.len(), large_batches.len());
        for position in 0..small_batches.len() {
            assert_eq!(
                small_batches.chunk(position),
                large_batches.chunk(position)
            );
        }
    }
}
