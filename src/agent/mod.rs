// src/agent/mod.rs
// The four LLM-backed decision stages, the guardrail, the SystemContext, and
// the loop driver that ties them together (spec.md §4).

pub mod answerer;
pub mod context;
pub mod data;
pub mod evaluator;
pub mod guardrail;
pub mod loop_driver;
pub mod rewriter;
pub mod summarizer;

pub use context::SystemContext;
pub use data::{Action, ChatMessage, MessageRole, QueryPlan, SearchHistoryEntry, SearchResult};
pub use loop_driver::{run_loop, stream_refusal, LoopDeps, LoopOutcome};

use thiserror::Error;

/// Rewriter/evaluator schema violations or empty responses (spec.md §7 PlannerError).
#[derive(Error, Debug, Clone)]
pub enum PlannerError {
    #[error("LLM call failed: {0}")]
    LlmFailure(String),
    #[error("response failed validation: {0}")]
    InvalidResponse(String),
}
