// src/agent/summarizer.rs
// Summarizer (spec.md §4.C5): distills one scraped page into a query-relevant
// synthesis. Never propagates failure; falls back to the snippet.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::llm::{CompletionRequest, LlmProvider, Message};

const SYSTEM_PROMPT: &str = "Synthesize the scraped page into a concise, query-relevant summary. \
Preserve original units, dates, and contextual anchors exactly as stated. Do not use outside \
knowledge beyond what is in the page.";

pub struct SummarizeInput<'a> {
    pub query: &'a str,
    pub url: &'a str,
    pub title: &'a str,
    pub snippet: &'a str,
    pub scraped_content: &'a str,
    pub conversation_history: &'a str,
}

#[derive(Serialize)]
struct CacheArgs<'a> {
    query: &'a str,
    url: &'a str,
    title: &'a str,
    snippet: &'a str,
    scraped_content: &'a str,
    conversation_history: &'a str,
}

pub async fn summarize(llm: &dyn LlmProvider, cache: &ResultCache, input: SummarizeInput<'_>, trace_id: Uuid) -> String {
    if input.scraped_content.trim().is_empty() {
        return input.snippet.to_string();
    }

    let cache_args = CacheArgs {
        query: input.query,
        url: input.url,
        title: input.title,
        snippet: input.snippet,
        scraped_content: input.scraped_content,
        conversation_history: input.conversation_history,
    };

    let prompt = format!(
        "Query: {}\nPage title: {}\nURL: {}\nSnippet: {}\nConversation context:\n{}\n\nPage content:\n{}",
        input.query, input.title, input.url, input.snippet, input.conversation_history, input.scraped_content
    );

    let req = CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![Message::user(prompt)],
        json_mode: false,
    };

    cache
        .get_or_compute("summarizer", &cache_args, || llm.complete(req))
        .await
        .unwrap_or_else(|e| {
            warn!(trace_id = %trace_id, url = input.url, error = %e, "summarizer LLM call failed, falling back to snippet");
            input.snippet.to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmStreamEvent;

    struct EchoProvider;

    #[async_trait::async_trait]
    impl LlmProvider for EchoProvider {
        async fn complete(&self, _req: CompletionRequest) -> anyhow::Result<String> {
            Ok("synthesized summary".to_string())
        }
        fn stream(&self, _req: CompletionRequest) -> futures::stream::BoxStream<'static, LlmStreamEvent> {
            Box::pin(futures::stream::empty())
        }
    }

    #[tokio::test]
    async fn empty_scraped_content_falls_back_to_snippet_without_calling_llm() {
        let cache = ResultCache::new(crate::kv::test_support::InMemoryKv::new(), 60, true);
        let out = summarize(
            &EchoProvider,
            &cache,
            SummarizeInput {
                query: "q",
                url: "https://example.com",
                title: "t",
                snippet: "the snippet",
                scraped_content: "   ",
                conversation_history: "",
            },
            Uuid::new_v4(),
        )
        .await;
        assert_eq!(out, "the snippet");
    }

    #[tokio::test]
    async fn second_identical_call_hits_cache() {
        let cache = ResultCache::new(crate::kv::test_support::InMemoryKv::new(), 60, true);
        let make_input = || SummarizeInput {
            query: "q",
            url: "https://example.com",
            title: "t",
            snippet: "snippet",
            scraped_content: "full page text",
            conversation_history: "",
        };
        let first = summarize(&EchoProvider, &cache, make_input(), Uuid::new_v4()).await;
        let second = summarize(&EchoProvider, &cache, make_input(), Uuid::new_v4()).await;
        assert_eq!(first, second);
        assert_eq!(first, "synthesized summary");
    }
}
