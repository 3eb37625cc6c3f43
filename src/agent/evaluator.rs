// src/agent/evaluator.rs
// Evaluator (spec.md §4.C7): decides continue vs answer.

use serde::Serialize;
use uuid::Uuid;

use super::{Action, PlannerError, SystemContext};
use crate::cache::ResultCache;
use crate::llm::{CompletionRequest, LlmProvider, Message};

const SYSTEM_PROMPT: &str = "You are a research sufficiency evaluator. Decide whether the \
accumulated search evidence answers every major component of the user's question with \
sufficient, current evidence. Choose \"answer\" only if it does; otherwise choose \"continue\" \
and explain what's missing. Respond with a JSON object: \
{\"type\": \"continue\"|\"answer\", \"title\": string, \"reasoning\": string, \"feedback\": string}.";

#[derive(Serialize)]
struct CacheArgs<'a> {
    user_question: &'a str,
    search_history: &'a str,
}

pub async fn evaluate(
    llm: &dyn LlmProvider,
    cache: &ResultCache,
    ctx: &SystemContext,
    user_question: &str,
    trace_id: Uuid,
) -> Result<Action, PlannerError> {
    let search_history = ctx.search_history_text();

    let cache_args = CacheArgs {
        user_question,
        search_history: &search_history,
    };
    let key = ResultCache::key("evaluator", &cache_args);
    if let Some(cached) = cache.get::<Action>(&key).await {
        return Ok(cached);
    }

    let prompt = format!(
        "User question: {}\n\nSearch history so far:\n{}",
        user_question, search_history
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

    let action: Action = serde_json::from_str(&raw)
        .map_err(|e| PlannerError::InvalidResponse(format!("evaluator response did not match schema: {e}")))?;

    action.validate().map_err(PlannerError::InvalidResponse)?;

    cache.put(&key, &action).await;
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmStreamEvent;

    struct FixedProvider(String);

    #[async_trait::async_trait]
    impl LlmProvider for FixedProvider {
        async fn complete(&self, _req: CompletionRequest) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
        fn stream(&self, _req: CompletionRequest) -> futures::stream::BoxStream<'static, LlmStreamEvent> {
            Box::pin(futures::stream::empty())
        }
    }

    #[tokio::test]
    async fn rejects_an_answer_missing_feedback() {
        let llm = FixedProvider(r#"{"type":"answer","title":"t","reasoning":"r","feedback":""}"#.to_string());
        let cache = ResultCache::new(crate::kv::test_support::InMemoryKv::new(), 60, true);
        let ctx = SystemContext::new("".into(), vec![]);
        let result = evaluate(&llm, &cache, &ctx, "q", Uuid::new_v4()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn accepts_a_well_formed_continue_action() {
        let llm = FixedProvider(
            r#"{"type":"continue","title":"t","reasoning":"r","feedback":"need more sources"}"#.to_string(),
        );
        let cache = ResultCache::new(crate::kv::test_support::InMemoryKv::new(), 60, true);
        let ctx = SystemContext::new("".into(), vec![]);
        let action = evaluate(&llm, &cache, &ctx, "q", Uuid::new_v4()).await.unwrap();
        assert!(!action.is_answer());
        assert_eq!(action.feedback(), "need more sources");
    }
}
