// src/scrape/mod.rs
// Scrape adapter capability (spec.md §4.C4): fetch, retry with backoff,
// extract readable text. Partial failures across a bulk call never abort it.

pub mod http_provider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub use http_provider::HttpScrapeProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub data: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: String::new(),
            title: None,
            description: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a bulk scrape (spec.md §4.C4): one result per URL in input
/// order, plus an aggregate flag that is false iff any URL failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkScrapeResult {
    pub results: Vec<ScrapeResult>,
    pub success: bool,
}

#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    /// Fetches and extracts readable text for a single URL, retrying with
    /// exponential backoff (base 500ms, doubling, max 8s) up to `max_retries`.
    async fn scrape_one(&self, url: &str, max_retries: u32, cancel: &CancellationToken) -> ScrapeResult;

    /// Bulk form: scrapes every URL concurrently and never aborts on a
    /// partial failure. Returns one result per URL, in input order, plus a
    /// `success` flag that is false iff any URL failed.
    async fn scrape_many(&self, urls: &[String], max_retries: u32, cancel: &CancellationToken) -> BulkScrapeResult {
        let tasks = urls.iter().map(|url| self.scrape_one(url, max_retries, cancel));
        let results: Vec<ScrapeResult> = futures::future::join_all(tasks).await;
        let success = results.iter().all(|r| r.success);
        BulkScrapeResult { results, success }
    }
}

/// Exponential backoff schedule: base 500ms, doubling, capped at 8s.
pub fn backoff_delay(attempt: u32) -> std::time::Duration {
    let base_ms: u64 = 500;
    let capped = base_ms.saturating_mul(1u64 << attempt.min(16)).min(8_000);
    std::time::Duration::from_millis(capped)
}

/// Strips HTML tags for the markdown-unavailable fallback path.
pub fn strip_html(html: &str) -> String {
    use scraper::Html;
    let document = Html::parse_document(html);
    let mut text = String::new();
    for node in document.root_element().text() {
        text.push_str(node);
        text.push(' ');
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        assert_eq!(backoff_delay(0).as_millis(), 500);
        assert_eq!(backoff_delay(1).as_millis(), 1_000);
        assert_eq!(backoff_delay(2).as_millis(), 2_000);
        assert_eq!(backoff_delay(4).as_millis(), 8_000);
        assert_eq!(backoff_delay(10).as_millis(), 8_000);
    }

    #[test]
    fn strip_html_drops_tags_and_collapses_whitespace() {
        let html = "<html><body><p>Hello   <b>world</b></p></body></html>";
        assert_eq!(strip_html(html), "Hello world");
    }
}
