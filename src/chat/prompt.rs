//! Prompt construction for the hosted chat model

use crate::retrieval::RetrievedChunk;

/// System and user halves of one model call
#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
}

/// Builds the structured prompt: behavior instruction, retrieved context
/// with provenance, the user's question, and the category-marker directive.
///
/// The marker string is configuration, so the vendor convention of signaling
/// the category inside the answer text is not baked into pipeline logic.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    marker: String,
    category_labels: Vec<String>,
}

const SYSTEM_INSTRUCTION: &str = "\
You are a careful legal information assistant embedded in a lawyer discovery \
and booking platform. You explain legal concepts clearly, relying first on \
the legal context provided with each question. You give information and \
guidance, never a formal legal opinion.

Rules you must follow:
- Treat the provided document extracts as your primary source. If a detail \
is not present in them, say so rather than inventing it, and mark anything \
drawn from general knowledge as general information.
- Never fabricate document names, section numbers, or case law.
- Do not promise outcomes, and do not suggest unlawful or deceptive actions.
- Outline typical options in general terms and recommend confirming exact \
steps with a qualified lawyer. If the user may be in immediate danger, tell \
them to contact local emergency services as well.
- Keep a professional, approachable tone with short paragraphs.
- End with exactly one short disclaimer line stating this is general legal \
information, not a formal legal opinion.";

impl PromptComposer {
    pub fn new(marker: impl Into<String>, category_labels: Vec<String>) -> Self {
        Self {
            marker: marker.into(),
            category_labels,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn compose(&self, question: &str, context: &[RetrievedChunk]) -> ComposedPrompt {
        let mut user = String::new();

        user.push_str("LEGAL CONTEXT FROM DOCUMENTS:\n");
        if context.is_empty() {
            user.push_str("(No relevant legal context was retrieved from the documents.)\n");
        } else {
            for retrieved in context {
                let chunk = &retrieved.chunk;
                user.push_str(&format!(
                    "\n[From {}, offset {}]\n{}\n",
                    chunk.document_ref, chunk.start_offset, chunk.text
                ));
            }
        }

        user.push_str("\nUSER QUESTION:\n");
        user.push_str(question);

        user.push_str(&format!(
            "\n\nAfter your answer, terminate your reply with one final line of \
             the exact form:\n{} <category>\nwhere <category> is one of: {}.",
            self.marker,
            self.category_labels.join(" / ")
        ));

        ComposedPrompt {
            system: SYSTEM_INSTRUCTION.to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunk;

    fn retrieved(document_ref: &str, text: &str, offset: usize) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                chunk_id: "id".to_string(),
                document_ref: document_ref.to_string(),
                text: text.to_string(),
                start_offset: offset,
            },
            similarity: 0.9,
            lexical_overlap: 0.5,
            combined_score: 0.78,
        }
    }

    fn composer() -> PromptComposer {
        PromptComposer::new(
            "Detected Legal Category:",
            vec!["Family Law".to_string(), "Criminal Law".to_string()],
        )
    }

    #[test]
    fn test_context_carries_provenance() {
        let prompt = composer().compose(
            "Can my landlord evict me without notice?",
            &[retrieved("rent-act.pdf", "Notice is mandatory before eviction.", 1200)],
        );
        assert!(prompt.user.contains("[From rent-act.pdf, offset 1200]"));
        assert!(prompt.user.contains("Notice is mandatory"));
        assert!(prompt.user.contains("Can my landlord evict me"));
    }

    #[test]
    fn test_empty_context_is_stated() {
        let prompt = composer().compose("question", &[]);
        assert!(prompt
            .user
            .contains("No relevant legal context was retrieved"));
    }

    #[test]
    fn test_marker_instruction_lists_categories() {
        let prompt = composer().compose("question", &[]);
        assert!(prompt.user.contains("Detected Legal Category:"));
        assert!(prompt.user.contains("Family Law / Criminal Law"));
    }

    #[test]
    fn test_system_instruction_sets_scope() {
        let prompt = composer().compose("question", &[]);
        assert!(prompt.system.contains("never a formal legal opinion"));
        assert!(prompt.system.contains("Never fabricate"));
    }
}
