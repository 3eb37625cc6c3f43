// src/error.rs
// Error taxonomy (spec.md §7). Local recovery happens where the failure occurs;
// only planner-level and fatal failures reach the HTTP layer as a typed response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("chat not found")]
    NotFound,

    #[error("no messages provided")]
    EmptyMessages,

    #[error("quota exceeded, resets at {reset_time}")]
    AdmissionDenied {
        reset_time: i64,
        remaining: u32,
        limit: u32,
    },

    /// Rewriter/evaluator schema violation or empty response after retry.
    #[error("planner error: {0}")]
    Planner(String),

    /// Client disconnect / request timeout.
    #[error("stream cancelled")]
    Cancelled,

    /// Key-value store or persistence failure that could not be contained
    /// by the fail-open policy of the caller (rare; most storage errors are
    /// swallowed at the call site per spec.md §7).
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Storage(anyhow::anyhow!(msg.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::EmptyMessages => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::AdmissionDenied { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Planner(_) => (StatusCode::BAD_GATEWAY, "upstream planning failed".to_string()),
            AppError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "request cancelled".to_string()),
            AppError::Storage(e) => {
                tracing::error!(error = %e, "storage error surfaced to client");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let mut response = (status, axum::Json(json!({ "error": message }))).into_response();

        if let AppError::AdmissionDenied {
            reset_time,
            remaining,
            limit,
        } = &self
        {
            let headers = response.headers_mut();
            headers.insert("X-Rate-Limit-Limit", (*limit).into());
            headers.insert("X-Rate-Limit-Remaining", (*remaining).into());
            headers.insert("X-Rate-Limit-Reset", (*reset_time).into());
        }

        response
    }
}
