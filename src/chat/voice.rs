//! Optional voice capabilities behind pluggable interfaces.
//!
//! Transcription and synthesis are independent external services; a missing
//! implementation is a configuration state the pipeline reports as such,
//! never an error path.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Voice backend failure: {0}")]
    Backend(String),

    #[error("No speech could be produced from the input")]
    EmptyResult,
}

/// Speech-to-text capability
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError>;
}

/// Text-to-speech capability
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

/// The configured voice services, either of which may be absent
#[derive(Clone, Default)]
pub struct VoiceSupport {
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl VoiceSupport {
    /// Neither capability configured
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn transcriber(&self) -> Option<&Arc<dyn Transcriber>> {
        self.transcriber.as_ref()
    }

    pub fn synthesizer(&self) -> Option<&Arc<dyn Synthesizer>> {
        self.synthesizer.as_ref()
    }
}
