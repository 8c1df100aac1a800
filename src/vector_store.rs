//! Vector database integration with Qdrant

use anyhow::Result;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::ingest::chunker::DocumentChunk;

const DEFAULT_COLLECTION: &str = "astrea_chunks";

/// A vector-index hit. Only the passage text and similarity score are
/// consumed downstream.
#[derive(Debug, Clone)]
pub struct RetrievedMatch {
    pub text: String,
    pub score: f32,
}

/// A chunk paired with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// Vector store backed by Qdrant
pub struct VectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl VectorStore {
    /// Connect to Qdrant server
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;

        Ok(Self {
            client,
            collection: DEFAULT_COLLECTION.to_string(),
            dimension: 1536, // text-embedding-3-small dimension
        })
    }

    /// Connect with custom collection name and dimension
    pub fn with_collection(url: &str, collection: impl Into<String>, dimension: usize) -> Result<Self> {
        let mut store = Self::new(url)?;
        store.collection = collection.into();
        store.dimension = dimension;
        Ok(store)
    }

    /// Initialize the collection if it doesn't exist
    pub async fn init_collection(&self) -> Result<()> {
        let collections = self.client.list_collections().await?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            info!("Creating collection '{}'", self.collection);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(self.collection.as_str()).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await?;

            info!("Collection created successfully");
        } else {
            debug!("Collection '{}' already exists", self.collection);
        }

        Ok(())
    }

    /// Upsert embedded chunks into the vector store
    pub async fn upsert_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<usize> {
        let points: Vec<PointStruct> = chunks
            .iter()
            .filter_map(|entry| {
                if entry.embedding.is_empty() {
                    return None;
                }

                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert("text".into(), entry.chunk.text.clone().into());
                payload.insert("source".into(), entry.chunk.meta.source.clone().into());
                payload.insert("title".into(), entry.chunk.meta.title.clone().into());
                payload.insert("docId".into(), entry.chunk.meta.doc_id.clone().into());
                payload.insert("url".into(), entry.chunk.meta.url.clone().into());

                Some(PointStruct::new(
                    entry.chunk.id.to_string(),
                    entry.embedding.clone(),
                    payload,
                ))
            })
            .collect();

        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        debug!("Upserting {} points to Qdrant", count);

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points))
            .await?;

        info!("Successfully upserted {} chunks", count);
        Ok(count)
    }

    /// Search for the nearest chunks, returning passage text and score in
    /// the store's own order.
    pub async fn search(&self, query_embedding: Vec<f32>, limit: u64) -> Result<Vec<RetrievedMatch>> {
        let search = SearchPointsBuilder::new(self.collection.as_str(), query_embedding, limit)
            .with_payload(true);

        let results = self.client.search_points(search).await?;

        let matches: Vec<RetrievedMatch> = results
            .result
            .into_iter()
            .filter_map(|point| {
                let text = point.payload.get("text")?.as_text()?.to_string();
                Some(RetrievedMatch {
                    text,
                    score: point.score,
                })
            })
            .collect();

        Ok(matches)
    }
}

trait QdrantValueExt {
    fn as_text(&self) -> Option<&str>;
}

impl QdrantValueExt for QdrantValue {
    fn as_text(&self) -> Option<&str> {
        match &self.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(v)) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::chunker::ChunkMeta;

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk::new(
            text.to_string(),
            0,
            ChunkMeta {
                source: "doc.pdf".to_string(),
                title: "doc.pdf".to_string(),
                doc_id: "doc.pdf#p1".to_string(),
                url: String::new(),
            },
        )
    }

    #[test]
    fn store_construction_does_not_connect() {
        // Qdrant client construction is lazy; no server needed.
        let store = VectorStore::new("http://localhost:6334").unwrap();
        assert_eq!(store.dimension, 1536);
        assert_eq!(store.collection, DEFAULT_COLLECTION);
    }

    #[test]
    fn with_collection_overrides_defaults() {
        let store =
            VectorStore::with_collection("http://localhost:6334", "custom", 3072).unwrap();
        assert_eq!(store.collection, "custom");
        assert_eq!(store.dimension, 3072);
    }

    #[tokio::test]
    async fn upsert_skips_chunks_without_embeddings() {
        let store = VectorStore::new("http://localhost:6334").unwrap();

        // All embeddings empty: nothing to send, no network touched.
        let chunks = vec![
            EmbeddedChunk {
                chunk: chunk("a"),
                embedding: Vec::new(),
            },
            EmbeddedChunk {
                chunk: chunk("b"),
                embedding: Vec::new(),
            },
        ];

        let count = store.upsert_chunks(&chunks).await.unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn qdrant_value_ext_reads_strings_only() {
        let text: QdrantValue = "hello".to_string().into();
        assert_eq!(text.as_text(), Some("hello"));

        let number: QdrantValue = 42i64.into();
        assert_eq!(number.as_text(), None);
    }

    #[tokio::test]
    #[ignore] // Requires a running Qdrant instance
    async fn round_trip_against_live_qdrant() {
        let store = VectorStore::with_collection("http://localhost:6334", "astrea_test", 4)
            .unwrap();
        store.init_collection().await.unwrap();

        let entry = EmbeddedChunk {
            chunk: chunk("microgravity alters bone density in mice"),
            embedding: vec![0.1, 0.2, 0.3, 0.4],
        };
        store.upsert_chunks(&[entry]).await.unwrap();

        let hits = store.search(vec![0.1, 0.2, 0.3, 0.4], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("microgravity"));
    }
}
