// src/search/http_provider.rs

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{SearchError, SearchHit, SearchProvider};

pub struct HttpSearchProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpSearchProvider {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct SearchResponseItem {
    title: String,
    url: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    date: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResponseItem>,
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(
        &self,
        query: &str,
        num: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let num = num.clamp(1, 10);

        let request = self
            .client
            .get(&self.api_url)
            .bearer_auth(&self.api_key)
            .query(&[("q", query), ("num", &num.to_string())])
            .send();

        let response = tokio::select! {
            result = request => result.map_err(|e| SearchError::Network(e.to_string()))?,
            _ = cancel.cancelled() => return Err(SearchError::Cancelled),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Provider { status, body });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .take(num)
            .map(|item| SearchHit {
                title: item.title,
                url: item.url,
                snippet: item.snippet,
                date: item.date,
            })
            .collect())
    }
}
