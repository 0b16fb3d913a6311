//! Query-time retrieval: semantic search over the index with lexical
//! re-ranking.
//!
//! Pure vector similarity can surface passages that are semantically close
//! but miss every keyword of a short legal query; the overlap score pulls
//! keyword-bearing chunks back up without discarding semantic recall.

use crate::chunker::Chunk;
use crate::config::RetrievalSettings;
use crate::embedding::EmbeddingProvider;
use crate::index::{IndexError, SharedIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Words too common to carry relevance signal in a query
const STOPWORDS: [&str; 28] = [
    "the", "is", "are", "a", "an", "of", "and", "to", "in", "under", "for", "on", "with", "this",
    "that", "it", "as", "by", "or", "be", "from", "at", "about", "into", "than", "then", "so",
    "such",
];

/// One retrieved chunk with its scoring breakdown.
///
/// The output ordering (descending combined score, ties by similarity rank)
/// is the contract downstream components depend on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// Semantic similarity derived from index distance, in (0, 1]
    pub similarity: f32,
    /// Fraction of query keywords present in the chunk text, in [0, 1]
    pub lexical_overlap: f32,
    /// Weighted blend of the two signals; the ranking key
    pub combined_score: f32,
}

/// Embeds the query, searches the shared index with over-fetch, and
/// re-ranks candidates by combined semantic and lexical score.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<SharedIndex>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<SharedIndex>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            provider,
            index,
            settings,
        }
    }

    /// Check that the loaded index and the embedding backend agree on
    /// dimension. Called at startup; a mismatch means the index was built
    /// with a different model and must not be served.
    pub fn verify_dimension(&self) -> Result<(), IndexError> {
        if let Some(snapshot) = self.index.current() {
            if !snapshot.is_empty() && snapshot.dimension() != self.provider.dimension() {
                return Err(IndexError::DimensionMismatch {
                    expected: snapshot.dimension(),
                    actual: self.provider.dimension(),
                });
            }
        }
        Ok(())
    }

    /// Top-`k` chunks for a query.
    ///
    /// `k` falls back to the configured default and is clamped to
    /// `[1, max_k]`. An absent or empty index, or a query-time embedding
    /// failure, yields an empty result; "no context" is a valid state the
    /// caller must handle, not an error.
    pub fn retrieve(&self, query: &str, k: Option<usize>) -> Vec<RetrievedChunk> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let k = k.unwrap_or(self.settings.default_k).clamp(1, self.settings.max_k);

        let Some(snapshot) = self.index.current() else {
            tracing::debug!("No index loaded, returning empty retrieval");
            return Vec::new();
        };
        if snapshot.is_empty() {
            return Vec::new();
        }

        let query_vector = match self.provider.embed(query) {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("Query embedding failed, proceeding without context: {}", e);
                return Vec::new();
            }
        };

        // Over-fetch to leave the re-ranker room to promote keyword matches.
        let top_n = k.saturating_mul(self.settings.overfetch_factor).max(k);
        let neighbors = match snapshot.search(&query_vector, top_n) {
            Ok(neighbors) => neighbors,
            Err(e) => {
                tracing::error!("Index search failed: {}", e);
                return Vec::new();
            }
        };

        let keywords = query_keywords(query);

        // similarity_rank is the position in the distance ordering; it breaks
        // combined-score ties so re-ranking never shuffles equal candidates.
        let mut candidates: Vec<(usize, RetrievedChunk)> = neighbors
            .into_iter()
            .enumerate()
            .filter_map(|(similarity_rank, (position, distance))| {
                let chunk = snapshot.chunk(position)?.clone();
                let similarity = 1.0 / (1.0 + distance);
                let lexical_overlap = lexical_overlap(&chunk.text, &keywords);
                let combined_score = self.settings.similarity_weight * similarity
                    + self.settings.overlap_weight * lexical_overlap;
                Some((
                    similarity_rank,
                    RetrievedChunk {
                        chunk,
                        similarity,
                        lexical_overlap,
                        combined_score,
                    },
                ))
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.1.combined_score
                .total_cmp(&a.1.combined_score)
                .then(a.0.cmp(&b.0))
        });
        candidates.truncate(k);

        candidates.into_iter().map(|(_, chunk)| chunk).collect()
    }
}

/// Stop-word-filtered, lower-cased keywords of a query
pub(crate) fn query_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !STOPWORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}

/// Fraction of query keywords present in the chunk text (case-insensitive
/// substring containment, matching how short legal phrases are quoted)
pub(crate) fn lexical_overlap(text: &str, keywords: &[String]) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let text = text.to_lowercase();
    let hits = keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
    hits as f32 / keywords.len() as f32
}
