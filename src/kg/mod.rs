//! Knowledge graph construction and querying.
//!
//! Triples are extracted from document chunks by an LLM, normalized
//! against a closed vocabulary of entity and relation types, and merged
//! into Neo4j. The same store serves the subgraph queries behind the
//! chat API's visualization payload.

pub mod extractor;
pub mod store;
pub mod triples;
pub mod view;

pub use extractor::TripleExtractor;
pub use store::{GraphSegment, GraphStore, SegmentNode};
pub use triples::{EntityType, RelationType, Triple, TripleSource};
pub use view::{GraphData, GraphEdge, GraphNode};
