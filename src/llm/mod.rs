// src/llm/mod.rs
// LLM provider capability (spec.md §1: "out of scope... behind a capability").
// The core depends only on this trait; `http_provider` is the one concrete
// adapter shipped with the crate.

pub mod http_provider;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use http_provider::HttpLlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    /// Ask the provider to constrain output to JSON (used by the rewriter and evaluator).
    pub json_mode: bool,
}

#[derive(Debug, Clone)]
pub enum LlmStreamEvent {
    TextDelta(String),
    Done { input_tokens: i64, output_tokens: i64 },
    Error(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// A single non-streaming completion, used by the rewriter, evaluator,
    /// guardrail, and summarizer (spec.md §4.C5-C7/C9).
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String>;

    /// Token-by-token streaming completion, used by the answerer (spec.md §4.C8).
    fn stream(&self, req: CompletionRequest) -> BoxStream<'static, LlmStreamEvent>;
}
