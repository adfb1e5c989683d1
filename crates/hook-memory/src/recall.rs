//! Session-start recall.
//!
//! Gathers the workspace summary, the session summary and the most relevant
//! long-term memories, and renders them as one context block. Recall is
//! best-effort: every service error is logged and the failing part is left
//! out, so an outage yields an empty block.

use crate::client::MemoryService;
use crate::config::MemoryConfig;
use crate::identity::Identity;
use crate::schema::{DateFilter, EqFilter, MemoryHit, SearchRequest};
use crate::summary::{SummaryScope, SummaryTarget};
use chrono::{DateTime, Duration, Utc};

/// Query text used when recall is triggered without a user prompt.
pub const RECALL_QUERY: &str = "recent conversation context and user preferences";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecallResult {
    pub workspace_summary: Option<String>,
    pub session_summary: Option<String>,
    /// Ordered by descending score, all at or above the threshold
    pub memories: Vec<MemoryHit>,
}

impl RecallResult {
    pub fn is_empty(&self) -> bool {
        self.workspace_summary.is_none()
            && self.session_summary.is_none()
            && self.memories.is_empty()
    }

    /// Render in fixed order: workspace summary, session summary, memories.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();

        if let Some(summary) = &self.workspace_summary {
            parts.push(format!("## Workspace Context\n{summary}"));
        }
        if let Some(summary) = &self.session_summary {
            parts.push(format!("## Session Context\n{summary}"));
        }
        if !self.memories.is_empty() {
            parts.push("## Relevant Memories".to_string());
            for (i, memory) in self.memories.iter().enumerate() {
                parts.push(format!("{}. {}", i + 1, memory.text));
            }
        }

        parts.join("\n\n")
    }
}

/// Recall everything available for the identity. Never fails.
pub fn recall(
    service: &dyn MemoryService,
    identity: &Identity,
    config: &MemoryConfig,
) -> RecallResult {
    let mut result = RecallResult::default();

    for target in SummaryTarget::enabled(identity, config) {
        let summary = match target.fetch(service, config) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(scope = target.scope.label(), error = %e, "summary unavailable");
                None
            }
        };
        match target.scope {
            SummaryScope::Workspace => result.workspace_summary = summary,
            SummaryScope::Session => result.session_summary = summary,
        }
    }

    let request = search_request(identity, config, Utc::now());
    let since = request.created_at.as_ref().map(|filter| filter.gte);
    result.memories = match service.search_long_term(&request) {
        Ok(hits) => select_memories(hits, config.min_score, config.recall_limit, since),
        Err(e) => {
            tracing::warn!(error = %e, "memory search unavailable");
            Vec::new()
        }
    };

    tracing::info!(
        namespace = %identity.namespace,
        session = %identity.session,
        workspace_summary = result.workspace_summary.is_some(),
        session_summary = result.session_summary.is_some(),
        memories = result.memories.len(),
        "recall finished"
    );
    result
}

/// Recall and render; empty string when nothing was found.
pub fn recall_context(
    service: &dyn MemoryService,
    identity: &Identity,
    config: &MemoryConfig,
) -> String {
    recall(service, identity, config).render()
}

/// Search for recent memories of the identity's namespace.
pub fn search_request(
    identity: &Identity,
    config: &MemoryConfig,
    now: DateTime<Utc>,
) -> SearchRequest {
    let cutoff = now - Duration::days(i64::from(config.summary_time_window_days));
    SearchRequest {
        text: RECALL_QUERY.to_string(),
        namespace: Some(EqFilter {
            eq: identity.namespace.to_string(),
        }),
        user_id: config.user_id.as_ref().map(|user| EqFilter { eq: user.clone() }),
        created_at: Some(DateFilter { gte: cutoff }),
        limit: config.recall_limit,
        offset: 0,
        distance_threshold: Some(1.0 - config.min_score),
    }
}

/// Keep hits scoring at least `min_score`, best first, at most `limit`.
///
/// Hits created before `since` are dropped; hits without a creation time
/// are kept.
pub fn select_memories(
    mut hits: Vec<MemoryHit>,
    min_score: f64,
    limit: usize,
    since: Option<DateTime<Utc>>,
) -> Vec<MemoryHit> {
    hits.retain(|hit| {
        hit.score >= min_score
            && !hit.text.trim().is_empty()
            && since.is_none_or(|since| hit.created_at.is_none_or(|at| at >= since))
    });
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}
