//! LLM-backed triple extraction for document chunks.

use tracing::{debug, warn};

use crate::config::EXTRACTION_MAX_CHARS;
use crate::error::Result;
use crate::integrations::{ChatMessage, OpenAIClient};
use crate::prompts::triple_extraction_prompt;

use super::triples::{strip_code_fences, triples_from_relations, ExtractionPayload, Triple, TripleSource};

/// Extracts normalized triples from chunk text with one LLM call per
/// chunk.
pub struct TripleExtractor {
    llm: OpenAIClient,
    model: String,
}

impl TripleExtractor {
    pub fn new(llm: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Extract triples from one chunk. Transport errors propagate to the
    /// caller; a response that fails to parse as JSON yields zero triples
    /// and is only logged, so ingestion can continue with the next chunk.
    pub async fn extract(&self, text: &str, source: &TripleSource) -> Result<Vec<Triple>> {
        let truncated: String = text.chars().take(EXTRACTION_MAX_CHARS).collect();
        let prompt = triple_extraction_prompt(&truncated);

        let raw = self
            .llm
            .chat_completion(vec![ChatMessage::user(prompt)], &self.model, 0.0)
            .await?;

        let payload: ExtractionPayload = match serde_json::from_str(strip_code_fences(&raw)) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(doc_id = %source.doc_id, "triple extraction returned invalid JSON: {err}");
                ExtractionPayload::default()
            }
        };

        let triples = triples_from_relations(payload.relations, source);
        debug!(
            doc_id = %source.doc_id,
            count = triples.len(),
            "extracted triples from chunk"
        );
        Ok(triples)
    }
}
