// src/main.rs
// Composition root: load config, build the shared state, mount routes, serve.

use std::sync::Arc;

use research_agent::api;
use research_agent::config::Config;
use research_agent::kv::RedisKv;
use research_agent::llm::HttpLlmProvider;
use research_agent::persistence::SqliteChatStore;
use research_agent::scrape::HttpScrapeProvider;
use research_agent::search::HttpSearchProvider;
use research_agent::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(bind = %config.server.bind_address(), "starting research agent");

    let kv = Arc::new(RedisKv::connect(&config.providers.redis_url).await?);
    let chats = Arc::new(SqliteChatStore::connect(&config.providers.database_url).await?);

    let llm = Arc::new(HttpLlmProvider::new(
        config.providers.llm_api_url.clone(),
        config.providers.llm_api_key.clone(),
        config.providers.llm_model.clone(),
    ));
    let search = Arc::new(HttpSearchProvider::new(
        config.providers.search_api_url.clone(),
        config.providers.search_api_key.clone(),
    ));
    let scrape = Arc::new(HttpScrapeProvider::new());

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(
        config.clone(),
        kv,
        llm,
        search,
        scrape,
        chats,
    ));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
