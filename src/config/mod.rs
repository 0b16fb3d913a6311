//! Configuration management for lexrag.
//!
//! Everything here is startup-time configuration: the index builder, the
//! retriever and the chat pipeline read it once. The only per-request knob
//! is the retrieval depth `k`, bounded by `retrieval.max_k`.

use crate::category::{CategoryEntry, CategoryTable};
use crate::error::{LexragError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub corpus: CorpusSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub chat: ChatSettings,
    /// Practice areas in priority order; earlier entries win on ambiguity
    pub categories: Vec<CategoryEntry>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
}

/// Corpus and index locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSettings {
    /// Directory of source documents, scanned wholesale on each build
    pub documents_dir: PathBuf,
    /// Directory holding the index artifact pair
    pub index_dir: PathBuf,
}

/// Sliding-window chunking parameters, in characters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    pub window: usize,
    pub overlap: usize,
}

/// Embedding backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// "fastembed" or "ngram-hash"
    pub backend: String,
    /// Model name for the fastembed backend
    pub model: String,
    /// Vector dimension for the ngram-hash backend
    pub dimension: usize,
    pub batch_size: usize,
}

/// Retrieval and re-ranking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub default_k: usize,
    /// Upper bound for per-request k overrides
    pub max_k: usize,
    /// Over-fetch multiplier applied before re-ranking
    pub overfetch_factor: usize,
    pub similarity_weight: f32,
    pub overlap_weight: f32,
}

/// Hosted language-model backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Full chat-completions URL (OpenAI-compatible)
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Chat pipeline knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Marker line the model is instructed to end its answer with
    pub category_marker: String,
    /// Maximum professional suggestions per answer
    pub max_suggestions: usize,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LexragError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LexragError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| LexragError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides in the format
    /// `LEXRAG_SECTION__KEY=value`
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("LEXRAG_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "LLM__ENDPOINT" => {
                self.llm.endpoint = value.to_string();
            }
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "LLM__API_KEY_ENV" => {
                self.llm.api_key_env = value.to_string();
            }
            "EMBEDDING__BACKEND" => {
                self.embedding.backend = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "RETRIEVAL__DEFAULT_K" => {
                self.retrieval.default_k =
                    value.parse().map_err(|_| LexragError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as integer", value),
                    })?;
            }
            "CORPUS__DOCUMENTS_DIR" => {
                self.corpus.documents_dir = PathBuf::from(value);
            }
            "CORPUS__INDEX_DIR" => {
                self.corpus.index_dir = PathBuf::from(value);
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// The configured category table, in priority order
    pub fn category_table(&self) -> CategoryTable {
        CategoryTable::new(self.categories.clone())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| LexragError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("lexrag").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| LexragError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".lexrag"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.lexrag");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
            },
            corpus: CorpusSettings {
                documents_dir: data_dir.join("corpus"),
                index_dir: data_dir.join("index"),
            },
            chunking: ChunkingSettings {
                window: 500,
                overlap: 100,
            },
            embedding: EmbeddingSettings {
                backend: "fastembed".to_string(),
                model: "all-MiniLM-L6-v2".to_string(),
                dimension: 384,
                batch_size: 32,
            },
            retrieval: RetrievalSettings {
                default_k: 8,
                max_k: 24,
                overfetch_factor: 3,
                similarity_weight: 0.7,
                overlap_weight: 0.3,
            },
            llm: LlmSettings {
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                api_key_env: "GROQ_API_KEY".to_string(),
                temperature: 0.15,
                max_tokens: 900,
                timeout_secs: 60,
            },
            chat: ChatSettings {
                category_marker: "Detected Legal Category:".to_string(),
                max_suggestions: 5,
            },
            categories: CategoryTable::default().entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.chunking.window, 500);
        assert_eq!(loaded.chunking.overlap, 100);
        assert_eq!(loaded.retrieval.default_k, 8);
        assert_eq!(loaded.categories.len(), config.categories.len());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(LexragError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_category_order_survives_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        Config::default().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        let labels: Vec<&str> = loaded.categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels[0], "Family Law");
        assert_eq!(labels[1], "Property / Rent Law");
    }
}
