// src/stream/mod.rs
// Streaming protocol (spec.md §4.C12, §6): a typed event stream carried to
// the client as SSE frames while the loop runs.

pub mod resumable;

use axum::response::sse::Event;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{Action, QueryPlan};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    NewChatCreated {
        chat_id: Uuid,
    },
    Planning {
        title: String,
        reasoning: String,
    },
    QueriesGenerated {
        plan: String,
        queries: Vec<String>,
    },
    SearchUpdate {
        query_index: usize,
        query: String,
        status: SearchUpdateStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SourcesFound {
        step_index: u32,
        sources: Vec<SourceSummary>,
    },
    NewAction {
        action: Action,
    },
    EvaluatorFeedback {
        feedback: String,
        action_type: String,
    },
    ActionUpdate {
        step_index: u32,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    TextDelta {
        delta: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchUpdateStatus {
    Loading,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub favicon: String,
}

impl SourceSummary {
    pub fn favicon_for(url: &str) -> String {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();
        format!("https://{}/favicon.ico", host)
    }
}

impl StreamEvent {
    /// Renders this event as one SSE frame: `event: <tag>` + `data: <json>`.
    pub fn to_sse_event(&self) -> Event {
        let tag = self.tag();
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Event::default().event(tag).data(data)
    }

    fn tag(&self) -> &'static str {
        match self {
            StreamEvent::NewChatCreated { .. } => "new-chat-created",
            StreamEvent::Planning { .. } => "planning",
            StreamEvent::QueriesGenerated { .. } => "queries-generated",
            StreamEvent::SearchUpdate { .. } => "search-update",
            StreamEvent::SourcesFound { .. } => "sources-found",
            StreamEvent::NewAction { .. } => "new-action",
            StreamEvent::EvaluatorFeedback { .. } => "evaluator-feedback",
            StreamEvent::ActionUpdate { .. } => "action-update",
            StreamEvent::TextDelta { .. } => "text-delta",
            StreamEvent::Error { .. } => "error",
        }
    }
}

pub fn query_plan_event(plan: &QueryPlan) -> StreamEvent {
    StreamEvent::QueriesGenerated {
        plan: plan.plan.clone(),
        queries: plan.queries.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_the_wire_protocol_table() {
        assert_eq!(StreamEvent::Planning { title: "t".into(), reasoning: "r".into() }.tag(), "planning");
        assert_eq!(StreamEvent::TextDelta { delta: "x".into() }.tag(), "text-delta");
    }

    #[test]
    fn favicon_is_derived_from_hostname() {
        assert_eq!(
            SourceSummary::favicon_for("https://example.com/a/b"),
            "https://example.com/favicon.ico"
        );
    }
}
