// src/search/mod.rs
// Search adapter capability (spec.md §4.C3).

pub mod http_provider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use http_provider::HttpSearchProvider;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Empty string when the provider doesn't supply a date.
    pub date: String,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search provider network error: {0}")]
    Network(String),
    #[error("search provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("search cancelled")]
    Cancelled,
}

impl SearchError {
    /// Whether the caller may reasonably retry this query.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Network(_) => true,
            SearchError::Provider { status, .. } => *status >= 500,
            SearchError::Cancelled => false,
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        num: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

/// Canonicalizes a URL for dedup purposes: lowercases scheme+host, strips a
/// trailing slash (spec.md §3).
pub fn canonicalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            let _ = u.set_scheme(&u.scheme().to_lowercase());
            if let Some(host) = u.host_str() {
                let host = host.to_lowercase();
                let _ = u.set_host(Some(&host));
            }
            let mut s = u.to_string();
            if s.ends_with('/') && u.path() == "/" {
                s.pop();
            }
            s
        }
        Err(_) => raw.trim_end_matches('/').to_lowercase(),
    }
}
