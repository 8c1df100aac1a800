//! Web page scraping and indexing.
//!
//! Fetches a page, extracts readable text, chunks it, and stores
//! embeddings in the vector index. URL batches run strictly
//! sequentially; one page's failure never aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use tracing::{info, warn};

use crate::embedding::EmbeddingService;
use crate::error::{Error, Result};
use crate::ingest::chunker::{ChunkMeta, Chunker};
use crate::vector_store::{EmbeddedChunk, VectorStore};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Minimum characters a page must yield to be worth indexing.
const MIN_CONTENT_LENGTH: usize = 50;
/// A content selector wins once its text exceeds this length.
const CONTENT_SELECTOR_THRESHOLD: usize = 100;

/// Main-content selectors, tried in order.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".content",
    ".main-content",
    ".post-content",
    ".entry-content",
    "body",
];

const EXCLUDED_TAGS: &[&str] = &["script", "style", "nav", "footer"];
const EXCLUDED_CLASSES: &[&str] = &["advertisement", "ads"];

/// Per-URL processing result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOutcome {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Scrape-and-index pipeline.
pub struct ScrapePipeline {
    http: reqwest::Client,
    embeddings: Arc<EmbeddingService>,
    vectors: Arc<VectorStore>,
    chunker: Chunker,
}

impl ScrapePipeline {
    pub fn new(embeddings: Arc<EmbeddingService>, vectors: Arc<VectorStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::ScrapeError(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            embeddings,
            vectors,
            chunker: Chunker::default(),
        })
    }

    /// Scrape one URL, chunk it, embed the chunks and upsert them into
    /// the vector store.
    pub async fn process_url(&self, url: &str) -> Result<ScrapeOutcome> {
        let content = scrape_web_content(&self.http, url).await?;

        if content.len() < MIN_CONTENT_LENGTH {
            return Err(Error::ScrapeError(
                "Insufficient content extracted from the webpage".to_string(),
            ));
        }

        let meta = ChunkMeta {
            source: url.to_string(),
            title: String::new(),
            doc_id: format!("{url}@{}", Utc::now().to_rfc3339()),
            url: url.to_string(),
        };

        let chunks = self.chunker.chunk(&content, &meta);
        info!("Created {} chunks from {}", chunks.len(), url);

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embeddings
            .embed_batch(&texts)
            .await
            .map_err(|e| Error::EmbeddingError(e.to_string()))?;

        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();

        let chunks_created = embedded.len();
        self.vectors
            .upsert_chunks(&embedded)
            .await
            .map_err(|e| Error::VectorStoreError(e.to_string()))?;

        info!("Successfully processed and stored content from {}", url);
        Ok(ScrapeOutcome {
            success: true,
            url: url.to_string(),
            chunks_created: Some(chunks_created),
            content_length: Some(content.len()),
            error: None,
        })
    }

    /// Process URLs strictly sequentially, capturing per-URL failures.
    pub async fn process_urls(&self, urls: &[String]) -> Vec<ScrapeOutcome> {
        let mut results = Vec::with_capacity(urls.len());

        for url in urls {
            match self.process_url(url).await {
                Ok(outcome) => results.push(outcome),
                Err(err) => {
                    warn!("Error processing {}: {}", url, err);
                    results.push(ScrapeOutcome {
                        success: false,
                        url: url.clone(),
                        chunks_created: None,
                        content_length: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        results
    }
}

/// Fetch a page and extract its readable text.
pub async fn scrape_web_content(http: &reqwest::Client, url: &str) -> Result<String> {
    info!("Scraping content from: {}", url);

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::ScrapeError(format!("Failed to fetch {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::ScrapeError(format!(
            "Failed to fetch {}: HTTP {}",
            url, status
        )));
    }

    let html = response
        .text()
        .await
        .map_err(|e| Error::ScrapeError(format!("Failed to read {}: {}", url, e)))?;

    let content = extract_content(&html);
    info!("Extracted {} characters from {}", content.len(), url);
    Ok(content)
}

/// Extract readable text from an HTML document: the first main-content
/// selector with substantial text wins, falling back to the whole body.
pub fn extract_content(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = clean_whitespace(&element_text(element));
            if text.len() > CONTENT_SELECTOR_THRESHOLD {
                return text;
            }
        }
    }

    // Nothing substantial matched; take whatever the body has.
    let body = Selector::parse("body").expect("static selector");
    document
        .select(&body)
        .next()
        .map(|el| clean_whitespace(&element_text(el)))
        .unwrap_or_default()
}

/// Collect text nodes under an element, skipping boilerplate and ad
/// containers.
fn element_text(element: ElementRef) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef, out: &mut String) {
    let value = element.value();
    if EXCLUDED_TAGS.contains(&value.name()) {
        return;
    }
    if value
        .classes()
        .any(|class| EXCLUDED_CLASSES.contains(&class))
    {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn clean_whitespace(text: &str) -> String {
    WHITESPACE_RUNS.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_prefers_main_content() {
        let html = format!(
            "<html><body>\
             <nav>Navigation junk</nav>\
             <main>{}</main>\
             <footer>Footer junk</footer>\
             </body></html>",
            "Microgravity exposure reduced femoral bone density in flight mice. ".repeat(3)
        );

        let content = extract_content(&html);
        assert!(content.contains("Microgravity exposure"));
        assert!(!content.contains("Navigation junk"));
        assert!(!content.contains("Footer junk"));
    }

    #[test]
    fn extract_skips_scripts_and_styles() {
        let html = format!(
            "<html><body><article>\
             <script>var tracking = true;</script>\
             <style>.x {{ color: red }}</style>\
             <p>{}</p>\
             </article></body></html>",
            "Flight animals were housed in the Bion habitat for thirty days. ".repeat(3)
        );

        let content = extract_content(&html);
        assert!(content.contains("Bion habitat"));
        assert!(!content.contains("tracking"));
        assert!(!content.contains("color: red"));
    }

    #[test]
    fn extract_skips_ad_containers() {
        let html = format!(
            "<html><body><main>\
             <div class=\"advertisement\">Buy now!</div>\
             <div class=\"ads\">Click here</div>\
             <p>{}</p>\
             </main></body></html>",
            "Tissue samples were analyzed by quantitative PCR after landing. ".repeat(3)
        );

        let content = extract_content(&html);
        assert!(content.contains("quantitative PCR"));
        assert!(!content.contains("Buy now"));
        assert!(!content.contains("Click here"));
    }

    #[test]
    fn extract_falls_back_to_body_for_short_main() {
        let html = "<html><body>\
             <main>tiny</main>\
             <p>Some body text that is also short.</p>\
             </body></html>";

        let content = extract_content(html);
        // Body fallback includes both fragments.
        assert!(content.contains("tiny"));
        assert!(content.contains("body text"));
    }

    #[test]
    fn extract_collapses_whitespace() {
        let html = format!(
            "<html><body><main><p>{}\n\n\n   spaced\t\ttext</p></main></body></html>",
            "word ".repeat(30)
        );

        let content = extract_content(&html);
        assert!(!content.contains("\n"));
        assert!(!content.contains("  "));
        assert!(content.contains("spaced text"));
    }

    #[test]
    fn extract_empty_document() {
        assert_eq!(extract_content(""), "");
        assert_eq!(extract_content("<html><body></body></html>"), "");
    }

    #[tokio::test]
    async fn scrape_web_content_fetches_and_extracts() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        let body = format!(
            "<html><body><main><p>{}</p></main></body></html>",
            "Mice aboard the ISS showed muscle atrophy within two weeks. ".repeat(3)
        );
        server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).body(&body);
        });

        let http = reqwest::Client::new();
        let content = scrape_web_content(&http, &server.url("/article"))
            .await
            .unwrap();

        assert!(content.contains("muscle atrophy"));
        assert!(!content.contains("<main>"));
    }

    #[tokio::test]
    async fn scrape_web_content_errors_on_http_failure() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not found");
        });

        let http = reqwest::Client::new();
        let err = scrape_web_content(&http, &server.url("/missing"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn scrape_outcome_serializes_camel_case() {
        let outcome = ScrapeOutcome {
            success: true,
            url: "http://a.test".to_string(),
            chunks_created: Some(3),
            content_length: Some(1200),
            error: None,
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["chunksCreated"], 3);
        assert_eq!(json["contentLength"], 1200);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_outcome_serializes_error() {
        let outcome = ScrapeOutcome {
            success: false,
            url: "http://a.test".to_string(),
            chunks_created: None,
            content_length: None,
            error: Some("boom".to_string()),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("chunksCreated").is_none());
    }
}
