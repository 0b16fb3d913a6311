use crate::config::Config;
use crate::error::{LexragError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every failure
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_chat(config, &mut errors);
        Self::validate_categories(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LexragError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.corpus.documents_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.documents_dir",
                "Documents directory cannot be empty",
            ));
        }
        if config.corpus.index_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.index_dir",
                "Index directory cannot be empty",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.window == 0 {
            errors.push(ValidationError::new(
                "chunking.window",
                "Window must be greater than 0",
            ));
        }
        if config.chunking.overlap >= config.chunking.window {
            errors.push(ValidationError::new(
                "chunking.overlap",
                format!(
                    "Overlap ({}) must be smaller than window ({})",
                    config.chunking.overlap, config.chunking.window
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let backend = &config.embedding.backend;
        if backend != "fastembed" && backend != "ngram-hash" {
            errors.push(ValidationError::new(
                "embedding.backend",
                format!(
                    "Backend must be 'fastembed' or 'ngram-hash', got '{}'",
                    backend
                ),
            ));
        }
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;
        if retrieval.default_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.default_k",
                "default_k must be greater than 0",
            ));
        }
        if retrieval.max_k < retrieval.default_k {
            errors.push(ValidationError::new(
                "retrieval.max_k",
                format!(
                    "max_k ({}) must be at least default_k ({})",
                    retrieval.max_k, retrieval.default_k
                ),
            ));
        }
        if retrieval.overfetch_factor == 0 {
            errors.push(ValidationError::new(
                "retrieval.overfetch_factor",
                "Over-fetch factor must be at least 1",
            ));
        }
        if retrieval.similarity_weight <= 0.0 || retrieval.overlap_weight < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.similarity_weight",
                "Similarity weight must be positive and overlap weight non-negative",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.llm.endpoint.is_empty() {
            errors.push(ValidationError::new(
                "llm.endpoint",
                "Endpoint cannot be empty",
            ));
        }
        if config.llm.model.is_empty() {
            errors.push(ValidationError::new("llm.model", "Model cannot be empty"));
        }
        if config.llm.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key environment variable name cannot be empty",
            ));
        }
        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }
        if config.llm.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_chat(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chat.category_marker.trim().is_empty() {
            errors.push(ValidationError::new(
                "chat.category_marker",
                "Category marker cannot be empty",
            ));
        }
        if config.chat.max_suggestions == 0 {
            errors.push(ValidationError::new(
                "chat.max_suggestions",
                "max_suggestions must be greater than 0",
            ));
        }
    }

    fn validate_categories(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.categories.is_empty() {
            errors.push(ValidationError::new(
                "categories",
                "At least one category must be configured",
            ));
        }
        for (i, entry) in config.categories.iter().enumerate() {
            if entry.label.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("categories[{}].label", i),
                    "Label cannot be empty",
                ));
            }
            if entry.triggers.is_empty() {
                errors.push(ValidationError::new(
                    format!("categories[{}].triggers", i),
                    "Trigger list cannot be empty",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_window() {
        let mut config = Config::default();
        config.chunking.overlap = config.chunking.window;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_invalid_backend() {
        let mut config = Config::default();
        config.embedding.backend = "faiss".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_max_k_bounds_default_k() {
        let mut config = Config::default();
        config.retrieval.max_k = config.retrieval.default_k - 1;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_empty_categories_rejected() {
        let mut config = Config::default();
        config.categories.clear();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = Config::default();
        config.chunking.window = 0;
        config.llm.endpoint.clear();
        config.chat.max_suggestions = 0;

        match ConfigValidator::validate(&config) {
            Err(LexragError::ConfigValidation { errors }) => {
                assert!(errors.len() >= 3);
            }
            other => panic!("Expected aggregated validation errors, got {:?}", other.err()),
        }
    }
}
