//! Astrea CLI - main entry point
//!
//! `serve` runs the HTTP API; `index` runs the batch ingestion pipeline
//! over the configured documents directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use astrea::chat::ChatEngine;
use astrea::config::{missing_indexing_vars, Config};
use astrea::embedding::EmbeddingService;
use astrea::error::Error;
use astrea::http::{self, AppState};
use astrea::ingest::Indexer;
use astrea::kg::GraphStore;
use astrea::metrics;
use astrea::scrape::ScrapePipeline;
use astrea::vector_store::VectorStore;

#[derive(Parser)]
#[command(name = "astrea")]
#[command(about = "Retrieval-augmented chat for space-biology publications", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (chat + scraping endpoints)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Index all PDFs from the documents directory
    Index {
        /// Directory to read PDFs from (overrides DOCUMENTS_DIR)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Skip knowledge-graph extraction, only build the vector index
        #[arg(long, default_value_t = false)]
        skip_kg: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("astrea=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Some(addr) = &cli.metrics_addr {
        match addr.parse() {
            Ok(addr) => metrics::spawn_metrics_server(addr),
            Err(err) => warn!("Invalid metrics address {addr}: {err}"),
        }
    }

    match cli.command {
        Commands::Serve { port } => {
            let mut config = Config::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }

            // A missing or unreachable graph store disables graph
            // features; chat keeps working without them.
            let graph = match GraphStore::from_env().await {
                Ok(graph) => graph,
                Err(err) => {
                    warn!("Neo4j connection failed ({err}); graph features disabled");
                    None
                }
            };

            let engine = Arc::new(ChatEngine::new(&config, graph)?);
            let scraper = Arc::new(build_scraper(&config)?);

            http::serve(AppState { engine, scraper }, config.port).await
        }

        Commands::Index { dir, skip_kg } => {
            let missing = missing_indexing_vars();
            if !missing.is_empty() {
                anyhow::bail!(
                    "Missing required environment variables: {}",
                    missing.join(", ")
                );
            }

            let mut config = Config::from_env()?;
            if let Some(dir) = dir {
                config.documents_dir = dir;
            }
            if skip_kg {
                config.build_kg = false;
            }

            let graph = if config.build_kg {
                match GraphStore::from_env().await {
                    Ok(graph) => graph,
                    Err(err) => {
                        warn!("Neo4j connection failed ({err}); skipping KG ingestion");
                        None
                    }
                }
            } else {
                None
            };

            let start = Instant::now();
            metrics::record_request_start("index");

            let indexer = Indexer::new(config, graph)?;
            let result = indexer.index_documents().await;
            metrics::record_request_result("index", start.elapsed(), result.is_ok());

            let report = result?;
            println!(
                "Indexed {} files into {} chunks ({} triples)",
                report.files, report.chunks, report.triples
            );
            Ok(())
        }
    }
}

fn build_scraper(config: &Config) -> Result<ScrapePipeline, Error> {
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
    ScrapePipeline::new(embeddings, vectors)
}
