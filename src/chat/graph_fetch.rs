//! Knowledge-graph lookup for the chat response.
//!
//! Failures here never fail the chat request: an unconfigured store, a
//! query error, or an LLM error all degrade to "no graph".

use std::sync::Arc;

use tracing::{debug, warn};

use crate::integrations::{ChatMessage, OpenAIClient};
use crate::kg::view::{assemble_graph, GraphData};
use crate::kg::GraphStore;
use crate::prompts::entity_extraction_prompt;

const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Extracts candidate entity names from an answer's inputs and queries
/// the graph store for the surrounding subgraph.
pub struct GraphFetcher {
    llm: OpenAIClient,
    model: String,
    store: Option<Arc<GraphStore>>,
}

impl GraphFetcher {
    pub fn new(llm: OpenAIClient, model: impl Into<String>, store: Option<Arc<GraphStore>>) -> Self {
        Self {
            llm,
            model: model.into(),
            store,
        }
    }

    /// Fetch the visualization graph for a chat turn, or `None` when the
    /// graph subsystem is unavailable. Entity extraction is best-effort;
    /// hallucinated names simply match nothing and yield an empty graph.
    pub async fn fetch(&self, question: &str, context: &str) -> Option<GraphData> {
        let store = self.store.as_ref()?;

        let names = match self.extract_entity_names(question, context).await {
            Ok(names) => names,
            Err(err) => {
                warn!("entity extraction for graph fetch failed: {err}");
                return None;
            }
        };

        debug!(count = names.len(), "graph fetch candidates");

        match store.subgraph(&names).await {
            Ok(segments) => Some(assemble_graph(&segments)),
            Err(err) => {
                warn!("graph subgraph query failed: {err}");
                None
            }
        }
    }

    async fn extract_entity_names(
        &self,
        question: &str,
        context: &str,
    ) -> crate::error::Result<Vec<String>> {
        let prompt = entity_extraction_prompt(question, context);
        let raw = self
            .llm
            .chat_completion(
                vec![ChatMessage::user(prompt)],
                &self.model,
                EXTRACTION_TEMPERATURE,
            )
            .await?;

        Ok(split_entity_names(&raw))
    }
}

/// Split the model's comma-separated output into trimmed, non-empty
/// names.
pub fn split_entity_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn split_trims_and_drops_empty_tokens() {
        let names = split_entity_names(" Bion-M1 ,  SF group ,, ISS ,");
        assert_eq!(names, vec!["Bion-M1", "SF group", "ISS"]);
    }

    #[test]
    fn split_of_empty_output_is_empty() {
        assert!(split_entity_names("").is_empty());
        assert!(split_entity_names("  \n ").is_empty());
    }

    #[test]
    fn split_single_name() {
        assert_eq!(split_entity_names("ISS"), vec!["ISS"]);
    }

    #[tokio::test]
    async fn unconfigured_store_returns_none_without_llm_call() {
        let server = MockServer::start_async().await;

        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "ISS" } }]
            }));
        });

        let llm = OpenAIClient::new("test_key")
            .unwrap()
            .with_base_url(server.base_url());
        let fetcher = GraphFetcher::new(llm, "gpt-4o-mini", None);

        let graph = fetcher.fetch("question", "context").await;
        assert!(graph.is_none());
        mock.assert_calls(0);
    }
}
