// src/state.rs
// Shared application state: the handles every request needs, built once in
// `main.rs` and threaded through axum's `State` extractor (spec.md SPEC_FULL
// §2 A5). Everything here is cheaply `Clone`-able (`Arc`-wrapped), mirroring
// the teacher's `state.rs` composition-root pattern.

use std::sync::Arc;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::kv::KvStore;
use crate::llm::LlmProvider;
use crate::persistence::ChatStore;
use crate::rate_limit::RateLimiter;
use crate::scrape::ScrapeProvider;
use crate::search::SearchProvider;
use crate::stream::resumable::StreamRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub kv: KvStore,
    pub cache: ResultCache,
    pub rate_limiter: Arc<RateLimiter>,
    pub llm: Arc<dyn LlmProvider>,
    pub search: Arc<dyn SearchProvider>,
    pub scrape: Arc<dyn ScrapeProvider>,
    pub chats: Arc<dyn ChatStore>,
    pub streams: Arc<StreamRegistry>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        kv: KvStore,
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
        scrape: Arc<dyn ScrapeProvider>,
        chats: Arc<dyn ChatStore>,
    ) -> Self {
        let cache = ResultCache::new(kv.clone(), config.cache.ttl_seconds, config.cache.enabled);
        let rate_limiter = Arc::new(RateLimiter::new(kv.clone(), &config.rate_limit));
        let streams = Arc::new(StreamRegistry::new(kv.clone()));

        Self {
            config,
            kv,
            cache,
            rate_limiter,
            llm,
            search,
            scrape,
            chats,
            streams,
        }
    }
}
