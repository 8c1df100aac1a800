//! Graph payload for the chat API's 3D visualization.

use std::collections::HashMap;

use serde::Serialize;

use super::store::{GraphSegment, SegmentNode};

/// Node of the visualization graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub score: f64,
}

/// Edge of the visualization graph. `evidence` lists the document ids
/// backing the relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub evidence: Vec<String>,
}

/// Graph returned alongside a chat answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphData {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<&SegmentNode> for GraphNode {
    fn from(node: &SegmentNode) -> Self {
        Self {
            id: node.id.clone(),
            label: node.name.clone(),
            node_type: node.entity_type.clone(),
            score: node.confidence,
        }
    }
}

/// Reshape flattened path segments into a deduplicated node/edge list.
/// Nodes collapse by id (last write wins); edges collapse by
/// (source, label, target).
pub fn assemble_graph(segments: &[GraphSegment]) -> GraphData {
    let mut nodes: HashMap<String, GraphNode> = HashMap::new();
    let mut edges: HashMap<(String, String, String), GraphEdge> = HashMap::new();

    for segment in segments {
        nodes.insert(segment.source.id.clone(), GraphNode::from(&segment.source));
        nodes.insert(segment.target.id.clone(), GraphNode::from(&segment.target));

        let key = (
            segment.source.id.clone(),
            segment.rel_type.clone(),
            segment.target.id.clone(),
        );
        edges.insert(
            key,
            GraphEdge {
                source: segment.source.id.clone(),
                target: segment.target.id.clone(),
                label: segment.rel_type.clone(),
                evidence: segment.doc_ids.clone(),
            },
        );
    }

    let mut nodes: Vec<GraphNode> = nodes.into_values().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    let mut edges: Vec<GraphEdge> = edges.into_values().collect();
    edges.sort_by(|a, b| (&a.source, &a.target, &a.label).cmp(&(&b.source, &b.target, &b.label)));

    GraphData { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, entity_type: &str) -> SegmentNode {
        SegmentNode {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            confidence: 0.8,
        }
    }

    fn segment(src: SegmentNode, rel: &str, dst: SegmentNode, docs: &[&str]) -> GraphSegment {
        GraphSegment {
            source: src,
            rel_type: rel.to_string(),
            doc_ids: docs.iter().map(|d| d.to_string()).collect(),
            target: dst,
        }
    }

    #[test]
    fn assemble_builds_nodes_and_edges() {
        let segments = vec![segment(
            node("1", "Bion-M1", "Mission"),
            "HAS_GROUP",
            node("2", "SF group", "Group"),
            &["paper.pdf#p1"],
        )];

        let graph = assemble_graph(&segments);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "1");
        assert_eq!(graph.edges[0].target, "2");
        assert_eq!(graph.edges[0].label, "HAS_GROUP");
        assert_eq!(graph.edges[0].evidence, vec!["paper.pdf#p1".to_string()]);
    }

    #[test]
    fn assemble_dedupes_nodes_by_id() {
        // The same entity appears in two path segments; it must appear
        // once in the output.
        let segments = vec![
            segment(
                node("1", "Bion-M1", "Mission"),
                "HAS_GROUP",
                node("2", "SF group", "Group"),
                &[],
            ),
            segment(
                node("2", "SF group", "Group"),
                "CONTAINS",
                node("3", "Mouse 7", "Mouse"),
                &[],
            ),
        ];

        let graph = assemble_graph(&segments);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(
            graph.nodes.iter().filter(|n| n.id == "2").count(),
            1
        );
    }

    #[test]
    fn assemble_dedupes_repeated_edges() {
        // Overlapping paths replay the same relationship.
        let seg = segment(
            node("1", "Bion-M1", "Mission"),
            "HAS_GROUP",
            node("2", "SF group", "Group"),
            &["a.pdf"],
        );
        let graph = assemble_graph(&[seg.clone(), seg]);

        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn assemble_empty_segments() {
        let graph = assemble_graph(&[]);
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert_eq!(graph, GraphData::empty());
    }

    #[test]
    fn node_carries_confidence_as_score() {
        let graph_node = GraphNode::from(&node("9", "Femur", "Tissue"));
        assert_eq!(graph_node.score, 0.8);
        assert_eq!(graph_node.node_type, "Tissue");
        assert_eq!(graph_node.label, "Femur");
    }

    #[test]
    fn graph_serializes_with_type_field() {
        let graph = assemble_graph(&[segment(
            node("1", "Bion-M1", "Mission"),
            "HAS_GROUP",
            node("2", "SF group", "Group"),
            &[],
        )]);

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"][0]["type"], "Mission");
        assert!(json["nodes"][0].get("node_type").is_none());
        assert_eq!(json["edges"][0]["label"], "HAS_GROUP");
    }

    #[test]
    fn parallel_edges_with_different_labels_are_kept() {
        let segments = vec![
            segment(
                node("1", "Mouse 7", "Mouse"),
                "FED",
                node("2", "Standard chow", "Diet"),
                &[],
            ),
            segment(
                node("1", "Mouse 7", "Mouse"),
                "RELATES_TO",
                node("2", "Standard chow", "Diet"),
                &[],
            ),
        ];

        let graph = assemble_graph(&segments);
        assert_eq!(graph.edges.len(), 2);
    }
}
