// src/scrape/http_provider.rs

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{backoff_delay, strip_html, ScrapeProvider, ScrapeResult};

pub struct HttpScrapeProvider {
    client: reqwest::Client,
}

impl Default for HttpScrapeProvider {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl HttpScrapeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_once(&self, url: &str) -> anyhow::Result<(String, bool)> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("status {}", response.status());
        }
        let is_markdown = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("markdown") || ct.contains("text/plain"))
            .unwrap_or(false);
        let body = response.text().await?;
        Ok((body, is_markdown))
    }
}

#[async_trait]
impl ScrapeProvider for HttpScrapeProvider {
    async fn scrape_one(&self, url: &str, max_retries: u32, cancel: &CancellationToken) -> ScrapeResult {
        let canonical = crate::search::canonicalize_url(url);
        let mut last_error = String::new();

        for attempt in 0..=max_retries {
            if cancel.is_cancelled() {
                return ScrapeResult::failure("cancelled");
            }

            let attempt_result = tokio::select! {
                r = self.fetch_once(&canonical) => r,
                _ = cancel.cancelled() => return ScrapeResult::failure("cancelled"),
            };

            match attempt_result {
                Ok((body, is_markdown)) => {
                    let text = if is_markdown { body } else { strip_html(&body) };
                    return ScrapeResult {
                        success: true,
                        data: text,
                        title: None,
                        description: None,
                        error: None,
                    };
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < max_retries {
                        warn!(url = %canonical, attempt, error = %last_error, "scrape attempt failed, retrying");
                        tokio::select! {
                            _ = tokio::time::sleep(backoff_delay(attempt)) => {},
                            _ = cancel.cancelled() => return ScrapeResult::failure("cancelled"),
                        }
                    }
                }
            }
        }

        ScrapeResult::failure(last_error)
    }
}
