//! Embedding generation behind a pluggable provider trait.
//!
//! Two backends: `fastembed` local models for production quality, and a
//! deterministic hashed n-gram embedder that needs no model download and
//! serves as the degraded/offline backend.

mod provider;

pub use provider::{
    EmbeddingError, EmbeddingProvider, FastEmbedProvider, HashedNgramProvider,
};

use std::sync::Arc;

/// Instantiate the embedding backend named in configuration.
///
/// `dimension` only applies to the hashed n-gram backend; fastembed models
/// fix their own dimension.
pub fn create_provider(
    backend: &str,
    model: &str,
    dimension: usize,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match backend {
        "fastembed" => Ok(Arc::new(FastEmbedProvider::new(model)?)),
        "ngram-hash" => Ok(Arc::new(HashedNgramProvider::new(dimension)?)),
        other => Err(EmbeddingError::Initialization(format!(
            "Unknown embedding backend: {}. Supported: fastembed, ngram-hash",
            other
        ))),
    }
}
