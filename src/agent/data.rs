// src/agent/data.rs
// Data model (spec.md §3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search::SearchHit;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub date: String,
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Invariant: non-empty only if `scraped_content` was non-empty at
    /// summarization time (spec.md §3).
    pub scraped_content: String,
    pub summary: String,
}

impl SearchResult {
    pub fn from_hit_unscraped(hit: SearchHit) -> Self {
        Self {
            date: hit.date,
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet.clone(),
            scraped_content: String::new(),
            summary: hit.snippet,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub query: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Continue {
        title: String,
        reasoning: String,
        feedback: String,
    },
    Answer {
        title: String,
        reasoning: String,
        feedback: String,
    },
}

impl Action {
    pub fn feedback(&self) -> &str {
        match self {
            Action::Continue { feedback, .. } | Action::Answer { feedback, .. } => feedback,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Action::Answer { .. })
    }

    /// Validates the mandatory-field invariant from spec.md §4.C7.
    pub fn validate(&self) -> Result<(), String> {
        let (title, reasoning, feedback) = match self {
            Action::Continue { title, reasoning, feedback } | Action::Answer { title, reasoning, feedback } => {
                (title, reasoning, feedback)
            }
        };
        if title.trim().is_empty() || reasoning.trim().is_empty() || feedback.trim().is_empty() {
            return Err("action must have non-empty title, reasoning, and feedback".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub plan: String,
    pub queries: Vec<String>,
}

impl QueryPlan {
    pub fn validate(&self) -> Result<(), String> {
        if !(3..=5).contains(&self.queries.len()) {
            return Err(format!(
                "query plan must have 3-5 queries, got {}",
                self.queries.len()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_plan_rejects_out_of_range_counts() {
        assert!(QueryPlan { plan: "p".into(), queries: vec!["a".into(), "b".into()] }.validate().is_err());
        assert!(QueryPlan {
            plan: "p".into(),
            queries: vec!["a".into(), "b".into(), "c".into()]
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn action_rejects_empty_feedback() {
        let action = Action::Continue {
            title: "t".into(),
            reasoning: "r".into(),
            feedback: "  ".into(),
        };
        assert!(action.validate().is_err());
    }
}
