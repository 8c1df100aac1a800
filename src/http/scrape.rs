//! Web scraping endpoints.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::config::missing_indexing_vars;
use crate::metrics;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeUrlRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeUrlsRequest {
    #[serde(default)]
    urls: Option<Vec<String>>,
}

/// `POST /scrape/url` - scrape a single URL and index it.
pub async fn scrape_url_handler(
    State(state): State<AppState>,
    Json(payload): Json<ScrapeUrlRequest>,
) -> Response {
    let Some(url) = payload.url.filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "URL is required",
                "message": "Please provide a URL to scrape",
            })),
        )
            .into_response();
    };

    if reqwest::Url::parse(&url).is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid URL format",
                "message": "Please provide a valid URL",
            })),
        )
            .into_response();
    }

    info!("Received request to scrape: {}", url);
    let start = Instant::now();
    metrics::record_request_start("scrape_url");

    match state.scraper.process_url(&url).await {
        Ok(result) => {
            metrics::record_request_result("scrape_url", start.elapsed(), true);
            (
                StatusCode::OK,
                Json(json!({
                    "message": "URL processed successfully",
                    "data": result,
                })),
            )
                .into_response()
        }
        Err(err) => {
            metrics::record_request_result("scrape_url", start.elapsed(), false);
            error!("Error processing {}: {}", url, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to process URL",
                    "message": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// `POST /scrape/urls` - scrape a batch of URLs sequentially. Every URL
/// is validated before any processing starts; individual failures never
/// abort the batch.
pub async fn scrape_urls_handler(
    State(state): State<AppState>,
    Json(payload): Json<ScrapeUrlsRequest>,
) -> Response {
    let Some(urls) = payload.urls.filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "URLs array is required",
                "message": "Please provide an array of URLs to scrape",
            })),
        )
            .into_response();
    };

    for url in &urls {
        if reqwest::Url::parse(url).is_err() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid URL format",
                    "message": format!("Invalid URL: {url}"),
                })),
            )
                .into_response();
        }
    }

    info!("Received request to scrape {} URLs", urls.len());
    let start = Instant::now();
    metrics::record_request_start("scrape_urls");

    let results = state.scraper.process_urls(&urls).await;
    let successful = results.iter().filter(|r| r.success).count();
    let failed = results.len() - successful;
    metrics::record_request_result("scrape_urls", start.elapsed(), failed == 0);

    (
        StatusCode::OK,
        Json(json!({
            "message": format!(
                "Processed {} URLs: {} successful, {} failed",
                urls.len(), successful, failed
            ),
            "summary": {
                "total": urls.len(),
                "successful": successful,
                "failed": failed,
            },
            "results": results,
        })),
    )
        .into_response()
}

/// `GET /scrape/status` - readiness check for the scrape/index
/// subsystem.
pub async fn status_handler() -> Response {
    let missing = missing_indexing_vars();

    if !missing.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "Missing required environment variables",
                "missingVars": missing,
            })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "message": "Web scraper is ready to process URLs",
            "features": [
                "Single URL scraping",
                "Multiple URLs scraping",
                "Content chunking",
                "Embedding generation",
                "Vector storage",
            ],
            "endpoints": {
                "single": "POST /scrape/url",
                "multiple": "POST /scrape/urls",
                "status": "GET /scrape/status",
            },
        })),
    )
        .into_response()
}
