//! HTTP API for the chat pipeline and the scrape/ingest endpoints.

pub mod chat;
pub mod scrape;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::chat::ChatEngine;
use crate::scrape::ScrapePipeline;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub scraper: Arc<ScrapePipeline>,
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::chat_handler))
        .route("/chat/telegram", post(chat::telegram_chat_handler))
        .route("/scrape/url", post(scrape::scrape_url_handler))
        .route("/scrape/urls", post(scrape::scrape_urls_handler))
        .route("/scrape/status", get(scrape::status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on the given port until the process exits.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server is running on http://localhost:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
