// src/agent/context.rs
// Per-request, single-writer mutable state (spec.md §3, §4.C10). Owned and
// passed to each stage rather than shared globally (spec.md §9).

use std::fmt::Write as _;

use super::data::{ChatMessage, SearchHistoryEntry};

pub struct SystemContext {
    pub location_context: String,
    pub messages: Vec<ChatMessage>,
    pub search_history: Vec<SearchHistoryEntry>,
    pub feedback: String,
    pub step: u32,
}

impl SystemContext {
    pub fn new(location_context: String, messages: Vec<ChatMessage>) -> Self {
        Self {
            location_context,
            messages,
            search_history: Vec::new(),
            feedback: String::new(),
            step: 0,
        }
    }

    pub fn message_history_text(&self) -> String {
        let mut out = String::new();
        for m in &self.messages {
            let role = match m.role {
                super::data::MessageRole::User => "user",
                super::data::MessageRole::Assistant => "assistant",
                super::data::MessageRole::System => "system",
            };
            let _ = writeln!(out, "### {}: {}", role, m.content);
        }
        out
    }

    /// Formats per spec.md §4.C10: one `## Query:` block per entry, with a
    /// `### date - title url snippet <content_summary>...</content_summary>`
    /// line per result.
    pub fn search_history_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.search_history {
            let _ = writeln!(out, "## Query: {}", entry.query);
            for r in &entry.results {
                let body = if !r.summary.is_empty() { &r.summary } else { &r.scraped_content };
                let _ = writeln!(
                    out,
                    "### {} - {} {} {} <content_summary>{}</content_summary>",
                    r.date, r.title, r.url, r.snippet, body
                );
            }
        }
        out
    }

    pub fn location_hints(&self) -> &str {
        &self.location_context
    }

    pub fn current_step(&self) -> u32 {
        self.step
    }

    pub fn last_feedback(&self) -> &str {
        &self.feedback
    }

    /// Appends a step's settled entries. Dedup against prior entries by
    /// canonical URL happens before this call (spec.md §4.C11 step 6); this
    /// method only upholds invariant (ii): appended only after the barrier.
    pub fn record_search(&mut self, entry: SearchHistoryEntry) {
        self.search_history.push(entry);
    }

    pub fn record_feedback(&mut self, text: String) {
        self.feedback = text;
    }

    pub fn increment_step(&mut self) {
        self.step += 1;
    }

    /// All canonical URLs already present anywhere in the loop's history
    /// (spec.md §3 invariant iv).
    pub fn known_urls(&self) -> std::collections::HashSet<String> {
        self.search_history
            .iter()
            .flat_map(|e| e.results.iter())
            .map(|r| crate::search::canonicalize_url(&r.url))
            .collect()
    }
}
