//! Embedding provider trait and its two implementations

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    Initialization(String),

    #[error("Embedding backend failure: {0}")]
    Service(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic for a fixed model version: the same
/// text always produces the same vector, and the dimension never changes for
/// the life of the provider. The index builder and the retriever must agree
/// on the provider, otherwise stored and query vectors are incomparable.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a batch of texts, preserving input order in the output
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Fixed output dimension
    fn dimension(&self) -> usize;

    /// Identifier of the model behind this provider
    fn model_name(&self) -> &str;
}

/// Local embedding via fastembed.
///
/// Models download to `~/.cache/huggingface/` on first use; the default
/// all-MiniLM-L6-v2 is ~90MB at 384 dimensions.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        let (embedding_model, dimension) = match model_name {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
            "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
            other => {
                return Err(EmbeddingError::Initialization(format!(
                    "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                    other
                )));
            }
        };

        tracing::info!(
            "Initializing embedding model {} ({}D, downloads on first use)",
            model_name,
            dimension
        );

        let options = InitOptions::new(embedding_model).with_show_download_progress(true);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::Initialization(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimension,
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let mut embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::Service(e.to_string()))?;

        let embedding = embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::Service("No embedding produced".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.is_empty()) {
            return Err(EmbeddingError::InvalidInput(
                "Batch contains empty text".to_string(),
            ));
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Service(e.to_string()))?;

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Deterministic character n-gram embedder.
///
/// Hashes lowercased trigrams into a fixed number of buckets and
/// L2-normalizes the counts. No model download, no network, and identical
/// output run-to-run, which makes it the offline fallback backend and the
/// workhorse for tests. Retrieval quality is well below a trained model.
pub struct HashedNgramProvider {
    dimension: usize,
    model_name: String,
}

const NGRAM: usize = 3;

impl HashedNgramProvider {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::Initialization(
                "Dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_name: format!("ngram-hash-{}", dimension),
        })
    }

    fn bucket(&self, gram: &str) -> usize {
        let hash = blake3::hash(gram.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }
}

impl EmbeddingProvider for HashedNgramProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let normalized: String = text
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let chars: Vec<char> = normalized.chars().collect();

        let mut vector = vec![0.0f32; self.dimension];

        if chars.len() < NGRAM {
            vector[self.bucket(&normalized)] += 1.0;
        } else {
            for window in chars.windows(NGRAM) {
                let gram: String = window.iter().collect();
                vector[self.bucket(&gram)] += 1.0;
            }
        }
        // Whole words as extra signals so short keyword queries land near
        // chunks that contain them verbatim.
        for word in normalized.split(' ').filter(|w| !w.is_empty()) {
            vector[self.bucket(word)] += 1.0;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngram_provider_is_deterministic() {
        let provider = HashedNgramProvider::new(128).unwrap();
        let a = provider.embed("divorce and custody proceedings").unwrap();
        let b = provider.embed("divorce and custody proceedings").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }

    #[test]
    fn test_ngram_provider_normalizes() {
        let provider = HashedNgramProvider::new(64).unwrap();
        let v = provider.embed("property dispute with the landlord").unwrap();
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ngram_similar_text_is_closer() {
        let provider = HashedNgramProvider::new(256).unwrap();
        let a = provider.embed("tenant rent eviction notice").unwrap();
        let b = provider.embed("tenant eviction and rent arrears").unwrap();
        let c = provider.embed("motor vehicle accident claim").unwrap();

        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    #[test]
    fn test_ngram_empty_text_rejected() {
        let provider = HashedNgramProvider::new(64).unwrap();
        assert!(provider.embed("").is_err());
    }

    #[test]
    fn test_ngram_batch_preserves_order() {
        let provider = HashedNgramProvider::new(64).unwrap();
        let texts = vec!["first clause".to_string(), "second clause".to_string()];
        let batch = provider.embed_batch(&texts).unwrap();
        assert_eq!(batch[0], provider.embed("first clause").unwrap());
        assert_eq!(batch[1], provider.embed("second clause").unwrap());
    }

    #[test]
    #[ignore] // Requires model download (~90MB) - run with: cargo test -- --ignored
    fn test_fastembed_provider_creation() {
        let provider = FastEmbedProvider::new("all-MiniLM-L6-v2").unwrap();
        assert_eq!(provider.dimension(), 384);
        assert_eq!(provider.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    #[ignore] // Requires model download (~90MB) - run with: cargo test -- --ignored
    fn test_fastembed_single_embedding() {
        let provider = FastEmbedProvider::new("all-MiniLM-L6-v2").unwrap();
        let embedding = provider.embed("What are my rights as a tenant?").unwrap();
        assert_eq!(embedding.len(), 384);
    }

    #[test]
    fn test_unknown_fastembed_model_rejected() {
        assert!(FastEmbedProvider::new("no-such-model").is_err());
    }
}
