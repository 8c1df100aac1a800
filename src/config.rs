//! Configuration for the Astrea service
//!
//! All settings come from environment variables (loaded from `.env` via
//! dotenvy by the binaries). Fixed pipeline tunables live here as constants.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default HTTP port for the chat/scrape API.
pub const DEFAULT_PORT: u16 = 8080;

/// Chunk size in characters for document splitting.
pub const CHUNK_SIZE: usize = 1000;
/// Overlap in characters between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 200;

/// Number of nearest neighbours fetched per retrieval.
pub const RETRIEVAL_TOP_K: u64 = 10;

/// Triples buffered before a Neo4j flush during ingestion.
pub const TRIPLE_BATCH_SIZE: usize = 100;
/// Chunk text sent to the extraction model is truncated to this many chars.
pub const EXTRACTION_MAX_CHARS: usize = 5000;

/// Maximum paths returned by the visualization subgraph query.
pub const SUBGRAPH_PATH_LIMIT: usize = 10;
/// Maximum hops walked from a matched entity in the subgraph query.
pub const SUBGRAPH_MAX_DEPTH: usize = 3;

/// Turns kept per chat session before the oldest are dropped.
pub const SESSION_TURN_CAP: usize = 100;

/// Session id used when the caller does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Environment variables that must be present for embedding + vector
/// storage to work. Checked by the scrape status endpoint and the
/// `index` subcommand.
pub const REQUIRED_INDEXING_VARS: &[&str] = &["OPENAI_API_KEY", "QDRANT_URL"];

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: String,
    /// Optional OpenAI-compatible base URL (e.g. an OpenRouter endpoint).
    pub openai_base_url: Option<String>,
    pub chat_model: String,
    pub extraction_model: String,
    pub embedding_model: String,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub documents_dir: PathBuf,
    pub build_kg: bool,
}

impl Config {
    /// Build a configuration from the process environment.
    ///
    /// Only the OpenAI key is strictly required here; the graph store
    /// checks its own variables so that graph features can be disabled
    /// independently.
    pub fn from_env() -> Result<Self> {
        let openai_api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| Error::MissingEnv("OPENAI_API_KEY".to_string()))?;

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            port,
            openai_api_key,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            chat_model: env::var("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            extraction_model: env::var("OPENAI_EXTRACTION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding_model: env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            qdrant_url: env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6334".to_string()),
            qdrant_collection: env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "astrea_chunks".to_string()),
            documents_dir: PathBuf::from(
                env::var("DOCUMENTS_DIR").unwrap_or_else(|_| "documents".to_string()),
            ),
            build_kg: build_kg_enabled(),
        })
    }
}

/// Whether ingestion also builds the knowledge graph. Defaults to enabled;
/// only the literal string "false" (any case) turns it off.
pub fn build_kg_enabled() -> bool {
    env::var("BUILD_KG")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Names of required indexing variables that are currently unset.
pub fn missing_indexing_vars() -> Vec<String> {
    REQUIRED_INDEXING_VARS
        .iter()
        .filter(|name| env::var(name).is_err())
        .map(|name| name.to_string())
        .collect()
}
