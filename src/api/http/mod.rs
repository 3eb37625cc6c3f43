// src/api/http/mod.rs

pub mod chat;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let timeout_secs = state.config.agent.request_timeout_secs;

    Router::new()
        .route("/chat", post(chat::post_chat).get(chat::get_chat))
        .route("/chat/{id}", axum::routing::delete(chat::delete_chat))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(timeout_secs)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
