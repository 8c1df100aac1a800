//! Character-based text splitter with overlap.

use uuid::Uuid;

/// Provenance carried by every chunk into the vector store and the
/// knowledge graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMeta {
    /// File path or URL the text came from.
    pub source: String,
    /// Display title (file name for PDFs, empty for scraped pages).
    pub title: String,
    /// Document identifier, `file.pdf#pN` when the page is known.
    pub doc_id: String,
    /// Original URL when scraped from the web.
    pub url: String,
}

/// Text chunk produced by the chunker.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    /// Unique chunk id
    pub id: Uuid,
    /// Raw text of the chunk
    pub text: String,
    /// Character offset of the first byte (for reference)
    pub start: usize,
    /// Provenance metadata
    pub meta: ChunkMeta,
}

impl DocumentChunk {
    pub fn new(text: String, start: usize, meta: ChunkMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            start,
            meta,
        }
    }
}

/// Splitter producing fixed-size character chunks with overlap.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self {
            size: size.max(1),
            overlap: overlap.min(size.saturating_sub(1)),
        }
    }

    /// Split text into overlapping chunks. Boundaries are nudged back to
    /// the nearest whitespace when one exists inside the chunk, so words
    /// are not cut mid-way.
    pub fn chunk(&self, text: &str, meta: &ChunkMeta) -> Vec<DocumentChunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.iter().all(|c| c.is_whitespace()) {
            return Vec::new();
        }

        let step = self.size.saturating_sub(self.overlap).max(1);
        let mut chunks = Vec::new();
        let mut idx = 0;

        while idx < chars.len() {
            let mut end = (idx + self.size).min(chars.len());

            // Break on whitespace when not at the end of the text.
            if end < chars.len() {
                if let Some(pos) = chars[idx..end].iter().rposition(|c| c.is_whitespace()) {
                    if pos > 0 {
                        end = idx + pos;
                    }
                }
            }

            let chunk_text: String = chars[idx..end].iter().collect();
            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(DocumentChunk::new(trimmed.to_string(), idx, meta.clone()));
            }

            if end == chars.len() {
                break;
            }
            idx += step.min(end.saturating_sub(idx)).max(1);
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(crate::config::CHUNK_SIZE, crate::config::CHUNK_OVERLAP)
    }
}
