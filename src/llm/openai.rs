//! OpenAI-compatible chat-completions client.
//!
//! Works against any backend exposing the `/chat/completions` shape (Groq,
//! OpenAI, local gateways). The endpoint, model and credentials come from
//! configuration; the API key is read from an environment variable and
//! never written to config files.

use crate::llm::{LanguageModel, LanguageModelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

pub struct ChatCompletionsModel {
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl ChatCompletionsModel {
    /// `endpoint` is the full completions URL, e.g.
    /// `https://api.groq.com/openai/v1/chat/completions`.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LanguageModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LanguageModelError::Network(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature,
            max_tokens,
            max_retries: DEFAULT_MAX_RETRIES,
            client,
        })
    }

    /// Read the API key from `env_var` and build the client.
    pub fn from_env(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        env_var: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LanguageModelError> {
        let api_key = std::env::var(env_var)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LanguageModelError::MissingApiKey(env_var.to_string()))?;
        Self::new(endpoint, model, api_key, temperature, max_tokens, timeout)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn send_once(
        &self,
        body: &CompletionRequest,
    ) -> Result<String, LanguageModelError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LanguageModelError::Timeout
                } else {
                    LanguageModelError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LanguageModelError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LanguageModelError::Http {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LanguageModelError::MalformedResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LanguageModelError::EmptyResponse);
        }
        Ok(content)
    }

    fn is_retryable(error: &LanguageModelError) -> bool {
        matches!(
            error,
            LanguageModelError::Network(_)
                | LanguageModelError::RateLimited
                | LanguageModelError::Http { status: 500..=599, .. }
        )
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LanguageModelError> {
        let body = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(content) => return Ok(content),
                Err(error) => {
                    attempt += 1;
                    if attempt > self.max_retries || !Self::is_retryable(&error) {
                        return Err(error);
                    }
                    let delay = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(
                        "Model call attempt {} failed ({}), retrying in {:?}",
                        attempt,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(endpoint: &str) -> ChatCompletionsModel {
        ChatCompletionsModel::new(
            endpoint,
            "llama-3.1-8b-instant",
            "test-key",
            0.15,
            900,
            Duration::from_secs(2),
        )
        .unwrap()
        .with_max_retries(0)
    }

    #[test]
    fn test_missing_api_key() {
        let result = ChatCompletionsModel::from_env(
            "https://example.invalid/v1/chat/completions",
            "m",
            "LEXRAG_TEST_UNSET_KEY",
            0.1,
            100,
            Duration::from_secs(1),
        );
        assert!(matches!(
            result,
            Err(LanguageModelError::MissingApiKey(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let model = model("http://127.0.0.1:9/chat/completions");
        let result = model.complete("system", "user").await;
        assert!(matches!(
            result,
            Err(LanguageModelError::Network(_)) | Err(LanguageModelError::Timeout)
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ChatCompletionsModel::is_retryable(
            &LanguageModelError::RateLimited
        ));
        assert!(ChatCompletionsModel::is_retryable(
            &LanguageModelError::Http {
                status: 503,
                message: String::new()
            }
        ));
        assert!(!ChatCompletionsModel::is_retryable(
            &LanguageModelError::Http {
                status: 401,
                message: String::new()
            }
        ));
        assert!(!ChatCompletionsModel::is_retryable(
            &LanguageModelError::EmptyResponse
        ));
    }
}
