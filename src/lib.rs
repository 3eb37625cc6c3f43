pub mod agent;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod kv;
pub mod llm;
pub mod persistence;
pub mod rate_limit;
pub mod scrape;
pub mod search;
pub mod state;
pub mod stream;

pub use error::{AppError, AppResult};
pub use state::AppState;
