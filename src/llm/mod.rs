//! Language-model backends behind a common async trait

mod openai;

pub use openai::ChatCompletionsModel;

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Model request timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Model backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Communication error: {0}")]
    Network(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),
}

/// A hosted chat model: system instruction plus user message in, raw answer
/// text out. All failures are recoverable at the pipeline level.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LanguageModelError>;

    fn model_name(&self) -> &str;
}

/// Scripted model for deterministic tests. Returns queued responses in
/// order, then the default response; records every prompt it sees.
pub struct MockModel {
    default_response: String,
    queued: Mutex<Vec<String>>,
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            queued: Mutex::new(Vec::new()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Model whose every call fails with a timeout
    pub fn failing() -> Self {
        Self {
            default_response: String::new(),
            queued: Mutex::new(Vec::new()),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a one-shot response returned before the default
    pub fn push_response(&self, response: impl Into<String>) {
        self.queued.lock().unwrap().insert(0, response.into());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Prompts seen so far, as (system, user) pairs
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LanguageModelError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));

        if self.fail {
            return Err(LanguageModelError::Timeout);
        }

        let queued = self.queued.lock().unwrap().pop();
        Ok(queued.unwrap_or_else(|| self.default_response.clone()))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
