//! The chat request pipeline: rewrite, retrieve, compose, graph-fetch.
//!
//! Steps within one request run strictly sequentially; concurrent
//! requests interleave only at await points. No retries anywhere: a
//! transient upstream failure surfaces to the HTTP layer, except the
//! graph fetch which degrades to "no graph".

pub mod composer;
pub mod graph_fetch;
pub mod retriever;
pub mod rewriter;

use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, DEFAULT_SESSION_ID};
use crate::embedding::EmbeddingService;
use crate::error::{Error, Result};
use crate::integrations::OpenAIClient;
use crate::kg::view::GraphData;
use crate::kg::GraphStore;
use crate::session::SessionStore;
use crate::vector_store::VectorStore;

pub use composer::AnswerComposer;
pub use graph_fetch::GraphFetcher;
pub use retriever::{ContextRetriever, RetrievedContext, CONTEXT_SEPARATOR};

/// Result of one chat turn.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub answer: String,
    /// `None` when the graph subsystem is unavailable or the retrieval
    /// came back empty.
    pub graph: Option<GraphData>,
}

/// Orchestrates the chat pipeline and owns the session store.
pub struct ChatEngine {
    llm: OpenAIClient,
    chat_model: String,
    retriever: ContextRetriever,
    composer: AnswerComposer,
    fetcher: GraphFetcher,
    sessions: SessionStore,
}

impl ChatEngine {
    /// Wire up the pipeline from configuration. The graph store is
    /// optional; without it chat still works, only without graphs.
    pub fn new(config: &Config, graph_store: Option<GraphStore>) -> Result<Self> {
        let mut llm = OpenAIClient::new(config.openai_api_key.clone())?;
        if let Some(base_url) = &config.openai_base_url {
            llm = llm.with_base_url(base_url.clone());
        }

        let embeddings = Arc::new(
            EmbeddingService::with_model(config.embedding_model.clone())
                .map_err(|e| Error::EmbeddingError(e.to_string()))?,
        );
        let vectors = Arc::new(
            VectorStore::with_collection(
                &config.qdrant_url,
                config.qdrant_collection.clone(),
                embeddings.dimension(),
            )
            .map_err(|e| Error::VectorStoreError(e.to_string()))?,
        );

        let store = graph_store.map(Arc::new);

        Ok(Self {
            retriever: ContextRetriever::new(embeddings, vectors),
            composer: AnswerComposer::new(llm.clone(), config.chat_model.clone()),
            fetcher: GraphFetcher::new(
                llm.clone(),
                config.extraction_model.clone(),
                store,
            ),
            chat_model: config.chat_model.clone(),
            llm,
            sessions: SessionStore::new(),
        })
    }

    /// Run one chat turn. `session_id` defaults to the single shared
    /// session when the caller passes none.
    pub async fn chat(&self, question: &str, session_id: Option<&str>) -> Result<ChatReply> {
        let session_id = session_id.unwrap_or(DEFAULT_SESSION_ID);
        let history = self.sessions.history(session_id).await;

        let rewritten =
            rewriter::rewrite(&self.llm, &self.chat_model, question, &history).await?;
        debug!(%rewritten, "rewrote question");

        let retrieved = self.retriever.retrieve(&rewritten).await?;

        let answer = self
            .composer
            .compose(question, &retrieved.context, &history)
            .await?;

        self.sessions
            .append_exchange(session_id, question, &answer)
            .await;

        // The fallback path skips the graph: with no context there is
        // nothing to extract entities from.
        let graph = if retrieved.is_empty {
            None
        } else {
            self.fetcher.fetch(question, &retrieved.context).await
        };

        Ok(ChatReply { answer, graph })
    }

    /// Session store handle (for inspection in tests).
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
