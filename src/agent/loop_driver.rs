// src/agent/loop_driver.rs
// Agent Loop Driver (spec.md §4.C11) — the heart of the system.
//
//   LOOP{ PLAN -> FANOUT -> EVAL -> (continue|answer) } -> STREAM_ANSWER
//
// Fan-out uses a shared claim set seeded from the context's known URLs so
// concurrent queries never scrape the same canonical URL twice (spec.md §3
// invariant iv) and a query's own results stay unique (invariant iii).

use std::collections::HashSet;
use std::sync::Mutex;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::answerer;
use super::data::{SearchHistoryEntry, SearchResult};
use super::evaluator;
use super::rewriter;
use super::summarizer::{self, SummarizeInput};
use super::SystemContext;
use crate::cache::ResultCache;
use crate::config::AgentConfig;
use crate::llm::{LlmProvider, LlmStreamEvent};
use crate::scrape::ScrapeProvider;
use crate::search::{canonicalize_url, SearchProvider};
use crate::stream::{query_plan_event, SearchUpdateStatus, SourceSummary, StreamEvent};

pub struct LoopDeps<'a> {
    pub llm: &'a dyn LlmProvider,
    pub search: &'a dyn SearchProvider,
    pub scrape: &'a dyn ScrapeProvider,
    pub cache: &'a ResultCache,
    pub config: &'a AgentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Answered,
    Cancelled,
}

/// Runs the loop to completion, writing progress events into `events` as it
/// goes. Returns the accumulated final answer text alongside the outcome so
/// the caller's `onFinish` sink can persist the assistant message.
pub async fn run_loop(
    deps: &LoopDeps<'_>,
    ctx: &mut SystemContext,
    user_question: &str,
    trace_id: Uuid,
    cancel: &CancellationToken,
    events: &mpsc::Sender<StreamEvent>,
) -> (LoopOutcome, String) {
    loop {
        if cancel.is_cancelled() {
            let _ = events
                .send(StreamEvent::Error {
                    message: "cancelled".to_string(),
                })
                .await;
            return (LoopOutcome::Cancelled, String::new());
        }

        if ctx.current_step() >= deps.config.max_steps {
            let text = stream_answer(deps, ctx, trace_id, true, cancel, events).await;
            return (LoopOutcome::Answered, text);
        }

        let _ = events
            .send(StreamEvent::Planning {
                title: "Planning".to_string(),
                reasoning: format!("Step {} of {}", ctx.current_step() + 1, deps.config.max_steps),
            })
            .await;

        let plan = rewriter::rewrite_with_fallback(deps.llm, deps.cache, ctx, user_question, trace_id).await;
        let _ = events.send(query_plan_event(&plan)).await;

        let step_index = ctx.current_step();
        let entries = fan_out(deps, ctx, &plan.queries, step_index, cancel, events).await;

        let mut sources = Vec::new();
        for entry in entries {
            for r in &entry.results {
                sources.push(SourceSummary {
                    title: r.title.clone(),
                    url: r.url.clone(),
                    snippet: r.snippet.clone(),
                    favicon: SourceSummary::favicon_for(&r.url),
                });
            }
            ctx.record_search(entry);
        }
        let _ = events
            .send(StreamEvent::SourcesFound {
                step_index,
                sources,
            })
            .await;

        match evaluator::evaluate(deps.llm, deps.cache, ctx, user_question, trace_id).await {
            Ok(action) => {
                ctx.record_feedback(action.feedback().to_string());
                let action_type = if action.is_answer() { "answer" } else { "continue" }.to_string();
                let feedback = action.feedback().to_string();

                let _ = events.send(StreamEvent::NewAction { action: action.clone() }).await;
                let _ = events
                    .send(StreamEvent::EvaluatorFeedback {
                        feedback,
                        action_type,
                    })
                    .await;

                if action.is_answer() {
                    let text = stream_answer(deps, ctx, trace_id, false, cancel, events).await;
                    return (LoopOutcome::Answered, text);
                }

                let _ = events
                    .send(StreamEvent::ActionUpdate {
                        step_index,
                        status: "completed".to_string(),
                        error: None,
                    })
                    .await;
                ctx.increment_step();
            }
            Err(e) => {
                error!(trace_id = %trace_id, error = %e, "evaluator failed, terminating loop");
                let _ = events
                    .send(StreamEvent::Error {
                        message: "evaluation failed".to_string(),
                    })
                    .await;
                let text = stream_answer(deps, ctx, trace_id, true, cancel, events).await;
                return (LoopOutcome::Answered, text);
            }
        }
    }
}

/// FANOUT: N queries concurrently, each with its own search -> scrape ->
/// summarize sub-pipeline, joined at a barrier before EVAL runs.
async fn fan_out(
    deps: &LoopDeps<'_>,
    ctx: &SystemContext,
    queries: &[String],
    step_index: u32,
    cancel: &CancellationToken,
    events: &mpsc::Sender<StreamEvent>,
) -> Vec<SearchHistoryEntry> {
    let claimed: Mutex<HashSet<String>> = Mutex::new(ctx.known_urls());

    let tasks = queries.iter().enumerate().map(|(i, query)| {
        run_one_query(deps, query, i, step_index, &claimed, cancel, events)
    });

    join_all(tasks).await.into_iter().flatten().collect()
}

async fn run_one_query(
    deps: &LoopDeps<'_>,
    query: &str,
    query_index: usize,
    step_index: u32,
    claimed: &Mutex<HashSet<String>>,
    cancel: &CancellationToken,
    events: &mpsc::Sender<StreamEvent>,
) -> Option<SearchHistoryEntry> {
    let _ = events
        .send(StreamEvent::SearchUpdate {
            query_index,
            query: query.to_string(),
            status: SearchUpdateStatus::Loading,
            error: None,
        })
        .await;

    let cache_key = ResultCache::key("search", &(query, deps.config.search_results_count));
    let hits = if let Some(cached) = deps.cache.get(&cache_key).await {
        Ok(cached)
    } else {
        match deps.search.search(query, deps.config.search_results_count, cancel).await {
            Ok(hits) => {
                deps.cache.put(&cache_key, &hits).await;
                Ok(hits)
            }
            Err(e) => Err(e),
        }
    };

    let hits = match hits {
        Ok(hits) => hits,
        Err(e) => {
            warn!(query, error = %e, "search failed for query, omitting from step");
            let _ = events
                .send(StreamEvent::SearchUpdate {
                    query_index,
                    query: query.to_string(),
                    status: SearchUpdateStatus::Error,
                    error: Some(e.to_string()),
                })
                .await;
            return None;
        }
    };

    // Claim unique, not-yet-seen URLs for this query under the shared set
    // (spec.md §3 invariants iii/iv): a URL is scraped only the first time
    // it's seen anywhere in this loop.
    let selected: Vec<_> = {
        let mut claimed = claimed.lock().unwrap();
        hits.into_iter()
            .filter(|hit| claimed.insert(canonicalize_url(&hit.url)))
            .take(deps.config.search_results_count)
            .collect()
    };

    let urls: Vec<String> = selected.iter().map(|hit| hit.url.clone()).collect();
    let bulk = deps.scrape.scrape_many(&urls, deps.config.max_scrape_retries, cancel).await;
    if !bulk.success {
        warn!(query, query_index, "at least one URL failed to scrape this step, continuing with partial results");
    }

    let summarize_tasks = selected.into_iter().zip(bulk.results.into_iter()).map(|(hit, scrape_result)| async move {
        if !scrape_result.success {
            return SearchResult::from_hit_unscraped(hit);
        }

        let summary = summarizer::summarize(
            deps.llm,
            deps.cache,
            SummarizeInput {
                query,
                url: &hit.url,
                title: &hit.title,
                snippet: &hit.snippet,
                scraped_content: &scrape_result.data,
                conversation_history: "",
            },
            Uuid::new_v4(),
        )
        .await;

        SearchResult {
            date: hit.date,
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
            scraped_content: scrape_result.data,
            summary,
        }
    });

    let results = join_all(summarize_tasks).await;

    let _ = events
        .send(StreamEvent::SearchUpdate {
            query_index,
            query: query.to_string(),
            status: SearchUpdateStatus::Completed,
            error: None,
        })
        .await;

    info!(step_index, query_index, query, results = results.len(), "query settled");

    Some(SearchHistoryEntry {
        query: query.to_string(),
        results,
    })
}

/// REFUSE branch (spec.md §4.C11): streams a short refusal via C8 against a
/// synthetic context instead of running the loop.
pub async fn stream_refusal(
    deps: &LoopDeps<'_>,
    reason: Option<&str>,
    trace_id: Uuid,
    cancel: &CancellationToken,
    events: &mpsc::Sender<StreamEvent>,
) -> String {
    use super::data::{ChatMessage, MessageRole};

    let instruction = match reason {
        Some(r) => format!(
            "The user's request cannot be researched. Politely explain the refusal. Reason: {}",
            r
        ),
        None => "The user's request cannot be researched. Politely explain the refusal.".to_string(),
    };
    let synthetic = SystemContext::new(
        String::new(),
        vec![ChatMessage {
            id: Uuid::new_v4(),
            role: MessageRole::System,
            content: instruction,
        }],
    );

    stream_answer(deps, &synthetic, trace_id, true, cancel, events).await
}

/// STREAM_ANSWER: forwards the answerer's text deltas into the client
/// stream and returns the accumulated text for the `onFinish` sink.
async fn stream_answer(
    deps: &LoopDeps<'_>,
    ctx: &SystemContext,
    trace_id: Uuid,
    is_final: bool,
    cancel: &CancellationToken,
    events: &mpsc::Sender<StreamEvent>,
) -> String {
    use futures_util::StreamExt;

    let mut stream = answerer::answer(deps.llm, ctx, trace_id, is_final);
    let mut full_text = String::new();

    loop {
        let next = tokio::select! {
            item = stream.next() => item,
            _ = cancel.cancelled() => {
                let _ = events.send(StreamEvent::Error { message: "cancelled".to_string() }).await;
                break;
            }
        };

        match next {
            Some(LlmStreamEvent::TextDelta(delta)) => {
                full_text.push_str(&delta);
                let _ = events.send(StreamEvent::TextDelta { delta }).await;
            }
            Some(LlmStreamEvent::Done { .. }) | None => break,
            Some(LlmStreamEvent::Error(message)) => {
                error!(trace_id = %trace_id, %message, "answerer stream error");
                let _ = events.send(StreamEvent::Error { message }).await;
                break;
            }
        }
    }

    full_text
}
