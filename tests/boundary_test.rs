// Boundary-behavior integration tests (spec.md §8): AGENT_MAX_STEPS=0 and a
// step where every query in the fan-out fails.
//
// The empty-messages -> 400 boundary is enforced inline in the HTTP handler
// (src/api/http/chat.rs::post_chat, checked before any side effect runs) and
// isn't covered here: exercising it end-to-end would need an HTTP test
// client (e.g. tower::ServiceExt::oneshot), which isn't part of this crate's
// dependency set.

mod common;

use common::{FakeScrapeProvider, FakeSearchProvider, MockLlmProvider};
use research_agent::agent::{run_loop, Action, ChatMessage, LoopDeps, LoopOutcome, MessageRole, QueryPlan, SystemContext};
use research_agent::cache::ResultCache;
use research_agent::config::AgentConfig;
use research_agent::kv::test_support::InMemoryKv;
use research_agent::stream::StreamEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn ctx(question: &str) -> SystemContext {
    SystemContext::new(
        String::new(),
        vec![ChatMessage { id: Uuid::new_v4(), role: MessageRole::User, content: question.into() }],
    )
}

#[tokio::test]
async fn max_steps_zero_answers_immediately_without_searching() {
    let llm = MockLlmProvider::new(
        QueryPlan { plan: "unused".into(), queries: vec!["unused".into(); 3] },
        vec![],
        "Direct answer with no research performed.",
    );
    let search = FakeSearchProvider::new(3);
    let scrape = FakeScrapeProvider;
    let cache = ResultCache::new(InMemoryKv::new(), 60, true);
    let cfg = AgentConfig {
        max_steps: 0,
        search_results_count: 3,
        max_scrape_retries: 2,
        request_timeout_secs: 60,
    };
    let deps = LoopDeps { llm: &llm, search: &search, scrape: &scrape, cache: &cache, config: &cfg };

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let mut context = ctx("quick question");

    let (outcome, text) = run_loop(&deps, &mut context, "quick question", Uuid::new_v4(), &cancel, &tx).await;
    drop(tx);
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }

    assert_eq!(outcome, LoopOutcome::Answered);
    assert!(!text.is_empty());
    assert_eq!(context.current_step(), 0, "the step counter must never advance when the budget is zero");
    assert!(events.iter().all(|e| !matches!(e, StreamEvent::Planning { .. })), "no planning step should run");
    assert!(events.iter().all(|e| !matches!(e, StreamEvent::SearchUpdate { .. })), "no search should run");
    assert_eq!(llm.complete_call_count(), 0, "neither the rewriter nor the evaluator should be invoked");
}

#[tokio::test]
async fn a_step_where_every_query_fails_still_reaches_the_evaluator() {
    let plan = QueryPlan { plan: "p".into(), queries: vec!["q0".into(), "q1".into(), "q2".into()] };
    let llm = MockLlmProvider::new(
        plan,
        vec![Action::Answer { title: "Answer".into(), reasoning: "no evidence available".into(), feedback: "search failed entirely".into() }],
        "Unable to find supporting sources; here is a best-effort answer.",
    );
    let search = FakeSearchProvider::failing(3, &["q0", "q1", "q2"]);
    let scrape = FakeScrapeProvider;
    let cache = ResultCache::new(InMemoryKv::new(), 60, true);
    let cfg = AgentConfig {
        max_steps: 3,
        search_results_count: 3,
        max_scrape_retries: 2,
        request_timeout_secs: 60,
    };
    let deps = LoopDeps { llm: &llm, search: &search, scrape: &scrape, cache: &cache, config: &cfg };

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let mut context = ctx("an obscure question");

    let (outcome, text) = run_loop(&deps, &mut context, "an obscure question", Uuid::new_v4(), &cancel, &tx).await;
    drop(tx);
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }

    assert_eq!(outcome, LoopOutcome::Answered);
    assert!(!text.is_empty());

    let error_updates = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::SearchUpdate { status: research_agent::stream::SearchUpdateStatus::Error, .. }))
        .count();
    assert_eq!(error_updates, 3, "all three queries should report an error status");

    let sources = events.iter().find_map(|e| match e {
        StreamEvent::SourcesFound { sources, .. } => Some(sources),
        _ => None,
    }).expect("sources-found is still emitted with an empty list");
    assert!(sources.is_empty());

    assert_eq!(events.iter().filter(|e| matches!(e, StreamEvent::NewAction { .. })).count(), 1, "the evaluator still runs on an empty step");
}
