//! Batch document ingestion.
//!
//! Reads PDFs from the configured directory, splits them into chunks,
//! optionally extracts triples into the knowledge graph, then embeds all
//! chunks and upserts them into the vector store. Graph ingestion runs
//! to completion before the vector upsert begins; there is no rollback
//! linking the two stores.

pub mod chunker;
pub mod pdf;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::{Config, TRIPLE_BATCH_SIZE};
use crate::embedding::EmbeddingService;
use crate::error::{Error, Result};
use crate::integrations::OpenAIClient;
use crate::kg::{GraphStore, TripleExtractor};
use crate::kg::triples::{Triple, TripleSource};
use crate::vector_store::{EmbeddedChunk, VectorStore};

use chunker::{ChunkMeta, Chunker, DocumentChunk};

/// Chunks per embedding request.
const EMBED_BATCH_SIZE: usize = 64;

/// Summary of one ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub files: usize,
    pub chunks: usize,
    pub triples: usize,
}

/// Batch ingestion driver.
pub struct Indexer {
    config: Config,
    chunker: Chunker,
    embeddings: Arc<EmbeddingService>,
    vectors: Arc<VectorStore>,
    extractor: Option<TripleExtractor>,
    graph: Option<Arc<GraphStore>>,
}

impl Indexer {
    pub fn new(config: Config, graph: Option<GraphStore>) -> Result<Self> {
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

        let extractor = if config.build_kg && graph.is_some() {
            let mut llm = OpenAIClient::new(config.openai_api_key.clone())?;
            if let Some(base_url) = &config.openai_base_url {
                llm = llm.with_base_url(base_url.clone());
            }
            Some(TripleExtractor::new(llm, config.extraction_model.clone()))
        } else {
            None
        };

        Ok(Self {
            chunker: Chunker::default(),
            embeddings,
            vectors,
            extractor,
            graph: graph.map(Arc::new),
            config,
        })
    }

    /// Ingest every PDF in the documents directory.
    pub async fn index_documents(&self) -> Result<IndexReport> {
        let chunks = self.load_and_chunk(&self.config.documents_dir)?;
        if chunks.is_empty() {
            info!("No PDF files found in documents folder.");
            return Ok(IndexReport::default());
        }

        let files = count_sources(&chunks);
        let mut report = IndexReport {
            files,
            chunks: chunks.len(),
            triples: 0,
        };

        if let (Some(extractor), Some(graph)) = (&self.extractor, &self.graph) {
            info!("Starting KG extraction and Neo4j ingestion...");
            report.triples = ingest_knowledge_graph(extractor, graph, &chunks).await;
            info!("KG: ingestion complete.");
        }

        self.embed_and_upsert(chunks).await?;
        info!("All data stored successfully");
        Ok(report)
    }

    /// Load every PDF under `dir` (top level only) and split into
    /// chunks annotated with per-page document ids.
    fn load_and_chunk(&self, dir: &Path) -> Result<Vec<DocumentChunk>> {
        let mut chunks = Vec::new();

        let mut entries: Vec<_> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
            })
            .collect();
        entries.sort_by(|a, b| a.path().cmp(b.path()));

        for entry in entries {
            let path = entry.path();
            let pages = match pdf::load_pdf(path) {
                Ok(pages) => pages,
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    continue;
                }
            };
            info!("Loaded: {}", path.display());

            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let multi_page = pages.len() > 1;

            for page in &pages {
                let meta = ChunkMeta {
                    source: path.to_string_lossy().to_string(),
                    title: base.clone(),
                    doc_id: if multi_page {
                        format!("{base}#p{}", page.number)
                    } else {
                        base.clone()
                    },
                    url: String::new(),
                };
                chunks.extend(self.chunker.chunk(&page.text, &meta));
            }
            info!("Chunked: {}", path.display());
        }

        Ok(chunks)
    }

    /// Embed all chunks and upsert them in one pass. A failure here
    /// terminates the batch even if graph ingestion already succeeded.
    async fn embed_and_upsert(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        self.vectors
            .init_collection()
            .await
            .map_err(|e| Error::VectorStoreError(e.to_string()))?;

        let mut embedded = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self
                .embeddings
                .embed_batch(&texts)
                .await
                .map_err(|e| Error::EmbeddingError(e.to_string()))?;

            embedded.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding }),
            );
        }

        let count = self
            .vectors
            .upsert_chunks(&embedded)
            .await
            .map_err(|e| Error::VectorStoreError(e.to_string()))?;
        info!("Upserted {} chunks to the vector store", count);
        Ok(())
    }
}

/// Run triple extraction over all chunks sequentially, flushing buffered
/// triples to Neo4j at the batch threshold and at end-of-corpus.
/// Per-chunk and per-flush failures are logged and skipped.
async fn ingest_knowledge_graph(
    extractor: &TripleExtractor,
    graph: &GraphStore,
    chunks: &[DocumentChunk],
) -> usize {
    graph.ensure_constraints().await;

    let mut buffer: Vec<Triple> = Vec::new();
    let mut total = 0;

    for (i, chunk) in chunks.iter().enumerate() {
        let source = triple_source(&chunk.meta);

        match extractor.extract(&chunk.text, &source).await {
            Ok(triples) => buffer.extend(triples),
            Err(err) => warn!("KG extraction error: {}", err),
        }

        if buffer.len() >= TRIPLE_BATCH_SIZE || i == chunks.len() - 1 {
            match graph.upsert_triples(&buffer).await {
                Ok(count) => {
                    total += count;
                    info!("KG: upserted {} triples (chunk {}/{})", count, i + 1, chunks.len());
                }
                Err(err) => warn!("Neo4j ingestion error: {}", err),
            }
            buffer.clear();
        }
    }

    total
}

fn triple_source(meta: &ChunkMeta) -> TripleSource {
    TripleSource {
        doc_id: if meta.doc_id.is_empty() {
            meta.source.clone()
        } else {
            meta.doc_id.clone()
        },
        title: meta.title.clone(),
        url: if meta.url.is_empty() {
            meta.source.clone()
        } else {
            meta.url.clone()
        },
    }
}

fn count_sources(chunks: &[DocumentChunk]) -> usize {
    let mut sources: Vec<&str> = chunks.iter().map(|c| c.meta.source.as_str()).collect();
    sources.sort_unstable();
    sources.dedup();
    sources.len()
}
