//! Chat endpoints.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::kg::view::GraphData;
use crate::metrics;
use crate::prompts::CHAT_ERROR_ANSWER;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    question: Option<String>,
}

/// `POST /chat` - answer plus visualization graph. Free-text answers are
/// reformatted into the four-section template; answers that already
/// carry a "Key Findings:" section pass through untouched.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let Some(question) = payload.question.filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Question is required" })),
        )
            .into_response();
    };

    let start = Instant::now();
    metrics::record_request_start("chat");

    match state.engine.chat(&question, None).await {
        Ok(reply) => {
            metrics::record_request_result("chat", start.elapsed(), true);
            let graph = reply.graph.unwrap_or_default();
            let answer = format_answer(&reply.answer, &graph);
            (
                StatusCode::OK,
                Json(json!({ "answer": answer, "graph": graph })),
            )
                .into_response()
        }
        Err(err) => {
            metrics::record_request_result("chat", start.elapsed(), false);
            error!("chat pipeline failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "answer": CHAT_ERROR_ANSWER,
                    "graph": GraphData::empty(),
                    "error": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// `POST /chat/telegram` - raw answer only, for the Telegram relay.
pub async fn telegram_chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let Some(question) = payload.question.filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Question is required" })),
        )
            .into_response();
    };

    let start = Instant::now();
    metrics::record_request_start("chat_telegram");

    match state.engine.chat(&question, None).await {
        Ok(reply) => {
            metrics::record_request_result("chat_telegram", start.elapsed(), true);
            (StatusCode::OK, Json(json!({ "answer": reply.answer }))).into_response()
        }
        Err(err) => {
            metrics::record_request_result("chat_telegram", start.elapsed(), false);
            error!("telegram chat pipeline failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "answer": CHAT_ERROR_ANSWER,
                    "error": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Reformat a free-text answer into the fixed four-section template,
/// filling the Experiments/Missions/Links sections from the graph.
pub fn format_answer(answer: &str, graph: &GraphData) -> String {
    if answer.contains("Key Findings:") {
        return answer.to_string();
    }

    let experiments = list_or_placeholder(
        graph
            .nodes
            .iter()
            .filter(|n| n.node_type == "Experiment")
            .map(|n| n.label.clone()),
        "No specific experiments found",
    );
    let missions = list_or_placeholder(
        graph
            .nodes
            .iter()
            .filter(|n| n.node_type == "Mission")
            .map(|n| n.label.clone()),
        "No specific missions found",
    );
    let links = list_or_placeholder(
        graph
            .edges
            .iter()
            .map(|e| format!("{} {} {}", e.source, e.label, e.target)),
        "No specific relationships found",
    );

    format!(
        "Key Findings:\n{answer}\n\nExperiments:\n- {experiments}\n\nMissions:\n- {missions}\n\nLinks:\n- {links}"
    )
}

fn list_or_placeholder(items: impl Iterator<Item = String>, placeholder: &str) -> String {
    let collected: Vec<String> = items.collect();
    if collected.is_empty() {
        placeholder.to_string()
    } else {
        collected.join("\n- ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kg::view::{GraphEdge, GraphNode};

    fn node(id: &str, label: &str, node_type: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: label.to_string(),
            node_type: node_type.to_string(),
            score: 1.0,
        }
    }

    #[test]
    fn answers_with_key_findings_pass_through() {
        let graph = GraphData::empty();
        let answer = "Key Findings:\n- bone loss observed\n";
        assert_eq!(format_answer(answer, &graph), answer);
    }

    #[test]
    fn free_text_answers_get_the_section_template() {
        let graph = GraphData {
            nodes: vec![
                node("1", "Bion-M1", "Mission"),
                node("2", "SF group", "Group"),
            ],
            edges: vec![GraphEdge {
                source: "1".to_string(),
                target: "2".to_string(),
                label: "HAS_GROUP".to_string(),
                evidence: vec![],
            }],
        };

        let formatted = format_answer("Mice lost bone density.", &graph);

        assert!(formatted.starts_with("Key Findings:\nMice lost bone density."));
        assert!(formatted.contains("Experiments:\n- No specific experiments found"));
        assert!(formatted.contains("Missions:\n- Bion-M1"));
        assert!(formatted.contains("Links:\n- 1 HAS_GROUP 2"));
    }

    #[test]
    fn empty_graph_yields_placeholders_everywhere() {
        let formatted = format_answer("Some answer.", &GraphData::empty());

        assert!(formatted.contains("No specific experiments found"));
        assert!(formatted.contains("No specific missions found"));
        assert!(formatted.contains("No specific relationships found"));
    }

    #[test]
    fn multiple_missions_are_listed() {
        let graph = GraphData {
            nodes: vec![
                node("1", "Bion-M1", "Mission"),
                node("2", "STS-135", "Mission"),
            ],
            edges: vec![],
        };

        let formatted = format_answer("answer", &graph);
        assert!(formatted.contains("Missions:\n- Bion-M1\n- STS-135"));
    }
}
