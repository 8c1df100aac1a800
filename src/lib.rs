//! Astrea - retrieval-augmented chat for space-biology publications
//!
//! This library provides:
//! - A chat pipeline that rewrites questions, retrieves passages from a
//!   vector store, composes grounded answers, and attaches a knowledge
//!   graph for visualization
//! - A batch ingestion pipeline that chunks PDFs, extracts
//!   (subject, predicate, object) triples with an LLM, and upserts both
//!   graph nodes/edges (Neo4j) and chunk embeddings (Qdrant)
//! - Web scraping endpoints that index scraped pages into the same
//!   vector store
//! - An HTTP surface exposing chat and scraping to the frontend and the
//!   Telegram relay

pub mod chat;
pub mod config;
pub mod embedding;
pub mod error;
pub mod http;
pub mod ingest;
pub mod integrations;
pub mod kg;
pub mod metrics;
pub mod prompts;
pub mod scrape;
pub mod session;
pub mod vector_store;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use integrations::{ChatMessage, OpenAIClient};
pub use session::{ChatTurn, Role, SessionStore};
