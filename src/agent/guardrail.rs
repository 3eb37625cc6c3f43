// src/agent/guardrail.rs
// Pre-loop safety classifier (spec.md §4.C9). Fail-open: a classifier error
// lets the loop proceed, but it must be logged.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::SystemContext;
use crate::llm::{CompletionRequest, LlmProvider, Message};

const SYSTEM_PROMPT: &str = "You are a safety classifier for a research assistant. Decide whether \
the conversation should be allowed through to research, or refused. Respond with a JSON object: \
{\"classification\": \"allow\"|\"refuse\", \"reason\": string or null}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Allow,
    Refuse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub classification: Classification,
    pub reason: Option<String>,
}

pub async fn classify(llm: &dyn LlmProvider, ctx: &SystemContext) -> GuardrailVerdict {
    let req = CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![Message::user(ctx.message_history_text())],
        json_mode: true,
    };

    match llm.complete(req).await {
        Ok(raw) => match serde_json::from_str::<GuardrailVerdict>(&raw) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "guardrail response did not match schema, failing open");
                GuardrailVerdict {
                    classification: Classification::Allow,
                    reason: None,
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "guardrail classifier errored, failing open");
            GuardrailVerdict {
                classification: Classification::Allow,
                reason: None,
            }
        }
    }
}
