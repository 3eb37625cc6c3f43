// Shared test doubles for the integration suite (spec.md §8's six
// end-to-end scenarios). Dispatch is by system-prompt content rather than
// call order, since the fan-out's summarizer call count varies with the
// number of scraped URLs.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::BoxStream;
use research_agent::agent::{Action, QueryPlan};
use research_agent::llm::{CompletionRequest, LlmProvider, LlmStreamEvent};
use research_agent::scrape::{ScrapeProvider, ScrapeResult};
use research_agent::search::{SearchError, SearchHit, SearchProvider};
use tokio_util::sync::CancellationToken;

pub struct MockLlmProvider {
    pub refuse: bool,
    pub plan: QueryPlan,
    pub actions: Mutex<VecDeque<Action>>,
    pub summary_text: String,
    pub answer_text: String,
    pub complete_calls: AtomicUsize,
}

impl MockLlmProvider {
    pub fn new(plan: QueryPlan, actions: Vec<Action>, answer_text: &str) -> Self {
        Self {
            refuse: false,
            plan,
            actions: Mutex::new(actions.into_iter().collect()),
            summary_text: "a synthesized page summary".to_string(),
            answer_text: answer_text.to_string(),
            complete_calls: AtomicUsize::new(0),
        }
    }

    pub fn refusing(reason: &str) -> Self {
        Self {
            refuse: true,
            plan: QueryPlan { plan: String::new(), queries: vec![] },
            actions: Mutex::new(VecDeque::new()),
            summary_text: String::new(),
            answer_text: format!("I can't help with that: {reason}"),
            complete_calls: AtomicUsize::new(0),
        }
    }

    pub fn complete_call_count(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);

        if req.system.contains("safety classifier") {
            let classification = if self.refuse { "refuse" } else { "allow" };
            return Ok(format!(r#"{{"classification":"{classification}","reason":null}}"#));
        }
        if req.system.contains("query planner") {
            return Ok(serde_json::to_string(&self.plan)?);
        }
        if req.system.contains("sufficiency evaluator") {
            let mut actions = self.actions.lock().unwrap();
            let action = actions.pop_front().unwrap_or(Action::Answer {
                title: "Done".into(),
                reasoning: "fallback".into(),
                feedback: "no more actions queued".into(),
            });
            return Ok(serde_json::to_string(&action)?);
        }
        if req.system.contains("Synthesize the scraped page") {
            return Ok(self.summary_text.clone());
        }
        anyhow::bail!("unexpected system prompt in mock: {}", req.system)
    }

    fn stream(&self, _req: CompletionRequest) -> BoxStream<'static, LlmStreamEvent> {
        let text = self.answer_text.clone();
        Box::pin(futures::stream::iter(vec![
            LlmStreamEvent::TextDelta(text),
            LlmStreamEvent::Done { input_tokens: 10, output_tokens: 20 },
        ]))
    }
}

pub struct FakeSearchProvider {
    pub hits_per_query: usize,
    pub failing_queries: HashSet<String>,
}

impl FakeSearchProvider {
    pub fn new(hits_per_query: usize) -> Self {
        Self { hits_per_query, failing_queries: HashSet::new() }
    }

    pub fn failing(hits_per_query: usize, failing_queries: &[&str]) -> Self {
        Self {
            hits_per_query,
            failing_queries: failing_queries.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SearchProvider for FakeSearchProvider {
    async fn search(&self, query: &str, num: usize, _cancel: &CancellationToken) -> Result<Vec<SearchHit>, SearchError> {
        if self.failing_queries.contains(query) {
            return Err(SearchError::Provider { status: 503, body: "simulated outage".into() });
        }
        Ok((0..self.hits_per_query.min(num))
            .map(|i| SearchHit {
                title: format!("{query} result {i}"),
                url: format!("https://example.com/{}/{}", query.replace(' ', "-"), i),
                snippet: format!("snippet for {query} #{i}"),
                date: "2026-01-01".to_string(),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeScrapeProvider;

#[async_trait]
impl ScrapeProvider for FakeScrapeProvider {
    async fn scrape_one(&self, _url: &str, _max_retries: u32, _cancel: &CancellationToken) -> ScrapeResult {
        ScrapeResult {
            success: true,
            data: "Full page content discussing the topic in depth.".to_string(),
            title: None,
            description: None,
            error: None,
        }
    }
}
