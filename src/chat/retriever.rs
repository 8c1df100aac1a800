//! Context retrieval: embed the rewritten query and collect the top-K
//! passages from the vector store.

use std::sync::Arc;

use crate::config::RETRIEVAL_TOP_K;
use crate::embedding::EmbeddingService;
use crate::error::{Error, Result};
use crate::vector_store::{RetrievedMatch, VectorStore};

/// Separator between concatenated passages in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Retrieval result handed to the answer composer.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub context: String,
    pub is_empty: bool,
}

/// Embeds queries and searches the vector index.
pub struct ContextRetriever {
    embeddings: Arc<EmbeddingService>,
    vectors: Arc<VectorStore>,
}

impl ContextRetriever {
    pub fn new(embeddings: Arc<EmbeddingService>, vectors: Arc<VectorStore>) -> Self {
        Self { embeddings, vectors }
    }

    /// Retrieve the context block for a rewritten query. Passages keep
    /// the store's returned order; no dedup or re-ranking happens here.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        let embedding = self
            .embeddings
            .embed(query)
            .await
            .map_err(|e| Error::EmbeddingError(e.to_string()))?;

        let matches = self
            .vectors
            .search(embedding, RETRIEVAL_TOP_K)
            .await
            .map_err(|e| Error::VectorStoreError(e.to_string()))?;

        Ok(build_context(&matches))
    }
}

/// Join matched passages into one context block.
pub fn build_context(matches: &[RetrievedMatch]) -> RetrievedContext {
    let context = matches
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    let is_empty = context.trim().is_empty();

    RetrievedContext { context, is_empty }
}
