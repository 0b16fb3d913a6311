//! The per-request answer pipeline and its payload shapes.
//!
//! One chat request runs retrieve → detect category → compose prompt →
//! model call → parse → match professionals, strictly in that order. Every
//! step degrades rather than fails: the user always receives an answer.

mod parser;
mod prompt;
mod voice;

pub use parser::{AnswerParser, ParsedAnswer, ParserBuildError};
pub use prompt::{ComposedPrompt, PromptComposer};
pub use voice::{Synthesizer, Transcriber, VoiceError, VoiceSupport};

use crate::category::CategoryTable;
use crate::llm::LanguageModel;
use crate::matcher::{ProfessionalCandidate, ProfessionalMatcher};
use crate::retrieval::Retriever;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Citation excerpts are capped so a response stays a summary, not a dump
const EXCERPT_LIMIT: usize = 400;

const FALLBACK_ANSWER: &str = "I'm sorry, I could not generate a complete answer \
to your question right now. Please try again in a moment, or browse the lawyer \
profiles on this platform to request a consultation directly.";

/// Incoming chat payload as the external HTTP layer hands it over
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub user_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    /// Per-request retrieval depth, clamped to the configured bound
    pub k: Option<usize>,
}

/// One source extract backing the answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub document_ref: String,
    pub excerpt: String,
}

/// Outgoing chat payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub detected_category: Option<String>,
    pub citations: Vec<Citation>,
    pub professionals: Vec<ProfessionalCandidate>,
}

/// Conversation turn shape persisted by the external session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_chunks: Vec<Citation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// Owns the collaborators of the answer flow. Stateless across requests:
/// nothing here mutates during `answer`, so concurrent requests and
/// mid-flight cancellation are safe by construction.
pub struct ChatPipeline {
    retriever: Retriever,
    categories: Arc<CategoryTable>,
    composer: PromptComposer,
    parser: AnswerParser,
    model: Arc<dyn LanguageModel>,
    matcher: ProfessionalMatcher,
    model_timeout: Duration,
    voice: VoiceSupport,
}

impl ChatPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        retriever: Retriever,
        categories: Arc<CategoryTable>,
        composer: PromptComposer,
        parser: AnswerParser,
        model: Arc<dyn LanguageModel>,
        matcher: ProfessionalMatcher,
        model_timeout: Duration,
        voice: VoiceSupport,
    ) -> Self {
        Self {
            retriever,
            categories,
            composer,
            parser,
            model,
            matcher,
            model_timeout,
            voice,
        }
    }

    pub fn voice(&self) -> &VoiceSupport {
        &self.voice
    }

    /// Answer one chat request.
    ///
    /// `candidates` is the professional directory snapshot supplied by the
    /// external store for this request. Retrieval, classification and model
    /// failures all degrade: an empty-context prompt, a null category, or
    /// the generic fallback answer, never an error to the caller.
    pub async fn answer(
        &self,
        request: &ChatRequest,
        candidates: &[ProfessionalCandidate],
    ) -> ChatResponse {
        let query = request.query.trim();

        let context = self.retriever.retrieve(query, request.k);
        let keyword_category = self.categories.detect(query);

        let prompt = self.composer.compose(query, &context);

        let raw = match tokio::time::timeout(
            self.model_timeout,
            self.model.complete(&prompt.system, &prompt.user),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!("Model call failed, serving fallback answer: {}", e);
                return self.fallback_response(candidates);
            }
            Err(_) => {
                tracing::warn!(
                    "Model call exceeded {:?}, serving fallback answer",
                    self.model_timeout
                );
                return self.fallback_response(candidates);
            }
        };

        let parsed = self.parser.parse(&raw, &self.categories, keyword_category);

        let citations: Vec<Citation> = context
            .iter()
            .map(|retrieved| Citation {
                document_ref: retrieved.chunk.document_ref.clone(),
                excerpt: truncate_chars(&retrieved.chunk.text, EXCERPT_LIMIT),
            })
            .collect();

        let professionals = self
            .matcher
            .suggest(parsed.category.as_deref(), candidates);

        ChatResponse {
            answer: parsed.body,
            detected_category: parsed.category,
            citations,
            professionals,
        }
    }

    /// Generic apologetic reply for model-backend failures: no category and
    /// no citations, but professional browsing still works.
    fn fallback_response(&self, candidates: &[ProfessionalCandidate]) -> ChatResponse {
        ChatResponse {
            answer: FALLBACK_ANSWER.to_string(),
            detected_category: None,
            citations: Vec::new(),
            professionals: self.matcher.suggest(None, candidates),
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryTable;
    use crate::config::RetrievalSettings;
    use crate::embedding::{EmbeddingProvider, HashedNgramProvider};
    use crate::index::{SharedIndex, VectorIndex};
    use crate::llm::MockModel;

    fn pipeline_with(model: Arc<dyn LanguageModel>, texts: &[&str]) -> ChatPipeline {
        let provider = Arc::new(HashedNgramProvider::new(64).unwrap());
        let chunker = crate::chunker::Chunker::new(300, 30).unwrap();

        let shared = if texts.is_empty() {
            SharedIndex::unloaded()
        } else {
            let mut chunks = Vec::new();
            for (i, text) in texts.iter().enumerate() {
                chunks.extend(chunker.chunk(&format!("doc{}.txt", i), text));
            }
            let vectors: Vec<Vec<f32>> = chunks
                .iter()
                .map(|c| provider.embed(&c.text).unwrap())
                .collect();
            SharedIndex::new(VectorIndex::build(64, vectors, chunks).unwrap())
        };

        let categories = Arc::new(CategoryTable::default());
        let labels = categories
            .entries
            .iter()
            .map(|e| e.label.clone())
            .collect();
        let settings = RetrievalSettings {
            default_k: 3,
            max_k: 8,
            overfetch_factor: 3,
            similarity_weight: 0.7,
            overlap_weight: 0.3,
        };

        ChatPipeline::new(
            Retriever::new(provider, Arc::new(shared), settings),
            Arc::clone(&categories),
            PromptComposer::new("Detected Legal Category:", labels),
            AnswerParser::new("Detected Legal Category:").unwrap(),
            model,
            ProfessionalMatcher::new(5),
            Duration::from_secs(5),
            VoiceSupport::disabled(),
        )
    }

    fn request(query: &str) -> ChatRequest {
        ChatRequest {
            query: query.to_string(),
            user_id: None,
            session_id: None,
            k: None,
        }
    }

    #[tokio::test]
    async fn test_answer_with_marker_overrides_keywords() {
        let model = Arc::new(MockModel::new(
            "File for divorce at the family court.\nDetected Legal Category: Family Law",
        ));
        let pipeline = pipeline_with(model, &["Divorce petitions go to the family court."]);

        let response = pipeline
            .answer(&request("How do I handle a property dispute?"), &[])
            .await;

        assert_eq!(response.answer, "File for divorce at the family court.");
        assert_eq!(response.detected_category.as_deref(), Some("Family Law"));
        assert!(!response.citations.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_fallback() {
        let model = Arc::new(MockModel::failing());
        let pipeline = pipeline_with(model, &["Some legal text."]);

        let response = pipeline.answer(&request("any question"), &[]).await;

        assert!(!response.answer.is_empty());
        assert_eq!(response.detected_category, None);
        assert!(response.citations.is_empty());
    }

    #[tokio::test]
    async fn test_empty_corpus_still_answers() {
        let model = Arc::new(MockModel::new("General guidance without sources."));
        let pipeline = pipeline_with(model.clone(), &[]);

        let response = pipeline
            .answer(&request("what about gardening rules?"), &[])
            .await;

        assert_eq!(response.answer, "General guidance without sources.");
        assert_eq!(response.detected_category, None);
        assert!(response.citations.is_empty());

        // The model was still consulted, with an empty-context prompt.
        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("No relevant legal context"));
    }

    #[tokio::test]
    async fn test_missing_marker_uses_keyword_detection() {
        let model = Arc::new(MockModel::new("A landlord must give notice."));
        let pipeline = pipeline_with(model, &["Rent control act extract."]);

        let response = pipeline
            .answer(&request("can my landlord evict me over rent?"), &[])
            .await;

        assert_eq!(
            response.detected_category.as_deref(),
            Some("Property / Rent Law")
        );
    }

    #[test]
    fn test_excerpt_truncation() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_chars(&long, EXCERPT_LIMIT).len(), 400);
        assert_eq!(truncate_chars("short", EXCERPT_LIMIT), "short");
    }

    #[test]
    fn test_turn_role_serialization() {
        let turn = ChatTurn {
            role: TurnRole::Assistant,
            content: "hello".to_string(),
            detected_category: None,
            source_chunks: Vec::new(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"assistant\""));
        assert!(!json.contains("detected_category"));
    }
}
