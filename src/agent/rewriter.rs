// src/agent/rewriter.rs
// Query rewriter (spec.md §4.C6): produces a plan and 3-5 search queries,
// filling gaps identified by the evaluator's last feedback.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::{PlannerError, QueryPlan, SystemContext};
use crate::cache::ResultCache;
use crate::llm::{CompletionRequest, LlmProvider, Message};

const SYSTEM_PROMPT: &str = "You are a research query planner. Given the conversation, the prior \
search history, any evaluator feedback, and the user's origin hints, produce a short plan and 3 \
to 5 concrete web search queries that would fill the remaining gaps. Use the origin hints to \
localize queries only when the question itself is locale-sensitive (e.g. \"weather near me\", \
\"local elections\"). Respond with a JSON object: {\"plan\": string, \"queries\": [string, ...]}.";

#[derive(Serialize)]
struct CacheArgs<'a> {
    user_question: &'a str,
    search_history: &'a str,
    feedback: &'a str,
    location_hints: &'a str,
}

pub async fn rewrite(
    llm: &dyn LlmProvider,
    cache: &ResultCache,
    ctx: &SystemContext,
    user_question: &str,
    trace_id: Uuid,
) -> Result<QueryPlan, PlannerError> {
    let search_history = ctx.search_history_text();
    let feedback = ctx.last_feedback().to_string();
    let location_hints = ctx.location_hints();

    let cache_args = CacheArgs {
        user_question,
        search_history: &search_history,
        feedback: &feedback,
        location_hints,
    };
    let key = ResultCache::key("rewriter", &cache_args);
    if let Some(cached) = cache.get::<QueryPlan>(&key).await {
        return Ok(cached);
    }

    let prompt = format!(
        "User question: {}\n\nOrigin hints: {}\n\nPrior search history:\n{}\n\nEvaluator feedback: {}",
        user_question, location_hints, search_history, feedback
    );

    let req = CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![Message::user(prompt)],
        json_mode: true,
    };

    let raw = llm
        .complete(req)
        .await
        .map_err(|e| PlannerError::LlmFailure(format!("trace={trace_id} {e}")))?;

    let plan: QueryPlan = serde_json::from_str(&raw).map_err(|e| {
        PlannerError::InvalidResponse(format!("rewriter response did not match schema: {e}"))
    })?;

    plan.validate().map_err(PlannerError::InvalidResponse)?;

    cache.put(&key, &plan).await;
    Ok(plan)
}

/// Tie-break (a) from spec.md §4.C11: on failure or an out-of-range query
/// count, retry once, then fall back to a single query equal to the user's
/// last message.
pub async fn rewrite_with_fallback(
    llm: &dyn LlmProvider,
    cache: &ResultCache,
    ctx: &SystemContext,
    user_question: &str,
    trace_id: Uuid,
) -> QueryPlan {
    for attempt in 0..2 {
        match rewrite(llm, cache, ctx, user_question, trace_id).await {
            Ok(plan) => return plan,
            Err(e) => warn!(trace_id = %trace_id, attempt, error = %e, "rewriter failed, retrying"),
        }
    }

    QueryPlan {
        plan: "Falling back to a single direct query.".to_string(),
        queries: vec![user_question.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFailsProvider;

    #[async_trait::async_trait]
    impl LlmProvider for AlwaysFailsProvider {
        async fn complete(&self, _req: CompletionRequest) -> anyhow::Result<String> {
            anyhow::bail!("boom")
        }
        fn stream(&self, _req: CompletionRequest) -> futures::stream::BoxStream<'static, crate::llm::LlmStreamEvent> {
            Box::pin(futures::stream::empty())
        }
    }

    #[tokio::test]
    async fn falls_back_to_single_query_after_repeated_failure() {
        let llm = AlwaysFailsProvider;
        let cache = ResultCache::new(crate::kv::test_support::InMemoryKv::new(), 60, true);
        let ctx = SystemContext::new("".into(), vec![]);
        let plan = rewrite_with_fallback(&llm, &cache, &ctx, "capital of France?", Uuid::new_v4()).await;
        assert_eq!(plan.queries, vec!["capital of France?".to_string()]);
    }
}
