// src/agent/answerer.rs
// Answerer (spec.md §4.C8): streams the final sourced answer.

use futures::stream::BoxStream;
use uuid::Uuid;

use super::SystemContext;
use crate::llm::{CompletionRequest, LlmProvider, LlmStreamEvent, Message};

const BASE_PROMPT: &str = "Write the final answer to the user's question using only the \
evidence in the search history below. Cite sources inline as markdown links, e.g. [source](url). \
Use the origin hints only to localize the answer when the question itself is locale-sensitive.";

const FINAL_SUFFIX: &str = "\n\nThe available evidence may be incomplete. Provide the best \
answer you can from what was gathered, and note where coverage is thin.";

pub fn answer(llm: &dyn LlmProvider, ctx: &SystemContext, trace_id: Uuid, is_final: bool) -> BoxStream<'static, LlmStreamEvent> {
    let mut system = BASE_PROMPT.to_string();
    if is_final {
        system.push_str(FINAL_SUFFIX);
    }

    let prompt = format!(
        "Origin hints: {}\n\nConversation:\n{}\n\nSearch history:\n{}\n\nEvaluator feedback: {}",
        ctx.location_hints(),
        ctx.message_history_text(),
        ctx.search_history_text(),
        ctx.last_feedback()
    );

    tracing::debug!(trace_id = %trace_id, is_final, "invoking answerer");

    let req = CompletionRequest {
        system,
        messages: vec![Message::user(prompt)],
        json_mode: false,
    };

    llm.stream(req)
}
