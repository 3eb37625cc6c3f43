// src/config/mod.rs
// Central configuration for the research agent - composes domain configs from env vars

pub mod helpers;

use serde::{Deserialize, Serialize};

/// Loop and step-budget configuration (spec.md §6: AGENT_MAX_STEPS, SEARCH_RESULTS_COUNT)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_steps: u32,
    pub search_results_count: usize,
    pub max_scrape_retries: u32,
    pub request_timeout_secs: u64,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self {
            max_steps: helpers::env_u32("AGENT_MAX_STEPS", 3),
            search_results_count: helpers::env_usize("SEARCH_RESULTS_COUNT", 3),
            max_scrape_retries: helpers::env_u32("SCRAPE_MAX_RETRIES", 3),
            request_timeout_secs: helpers::env_u64("REQUEST_TIMEOUT_SECS", 60),
        }
    }
}

/// Rate limiting configuration (spec.md §4.C1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub daily_request_limit: u32,
    pub global_rate_max: u32,
    pub global_rate_window_ms: u64,
    pub admin_user_ids: std::collections::HashSet<String>,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            daily_request_limit: helpers::env_u32("DAILY_REQUEST_LIMIT", 5),
            global_rate_max: helpers::env_u32("GLOBAL_RATE_MAX", 30),
            global_rate_window_ms: helpers::env_u64("GLOBAL_RATE_WINDOW_MS", 60_000),
            admin_user_ids: helpers::env_set("ADMIN_USER_IDS"),
        }
    }
}

/// Result cache configuration (spec.md §4.C2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: i64,
    pub enabled: bool,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            ttl_seconds: helpers::env_parsed("CACHE_TTL_SECONDS", 21_600i64),
            enabled: helpers::env_parsed("CACHE_ENABLED", true),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: helpers::env_or("HOST", "0.0.0.0"),
            port: helpers::env_parsed("PORT", 8080u16),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Upstream provider configuration (search, scrape, LLM, redis, chat store, auth)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub redis_url: String,
    pub database_url: String,
    pub jwt_secret: String,

    pub search_api_url: String,
    pub search_api_key: String,

    pub scrape_api_url: Option<String>,
    pub scrape_api_key: Option<String>,

    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: helpers::env_or("REDIS_URL", "redis://127.0.0.1:6379"),
            database_url: helpers::env_or("DATABASE_URL", "sqlite://chat.db"),
            jwt_secret: helpers::env_or("JWT_SECRET", "dev-secret-change-in-production"),

            search_api_url: helpers::require_env("SEARCH_API_URL"),
            search_api_key: helpers::require_env("SEARCH_API_KEY"),

            scrape_api_url: std::env::var("SCRAPE_API_URL").ok(),
            scrape_api_key: std::env::var("SCRAPE_API_KEY").ok(),

            llm_api_url: helpers::require_env("LLM_API_URL"),
            llm_api_key: helpers::require_env("LLM_API_KEY"),
            llm_model: helpers::env_or("LLM_MODEL", "gpt-4.1"),
        }
    }
}

/// Top-level configuration structure - composes all domain configs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub providers: ProviderConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            agent: AgentConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            cache: CacheConfig::from_env(),
            server: ServerConfig::from_env(),
            providers: ProviderConfig::from_env(),
        }
    }
}
