//! Memory service wire types.
//!
//! Request types serialize exactly what the hooks send. Response types keep
//! unknown fields so a read-modify-write of working memory does not drop
//! anything the server stored.

use crate::config::ExtractionStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One message in a session's working memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemoryMessage {
    pub fn new(role: Role, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Some(created_at),
            extra: Map::new(),
        }
    }
}

/// Long-term extraction settings attached to working memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub strategy: ExtractionStrategy,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

impl StrategyConfig {
    pub fn new(strategy: ExtractionStrategy, custom_prompt: Option<&str>) -> Self {
        let mut config = Map::new();
        if strategy == ExtractionStrategy::Custom {
            if let Some(prompt) = custom_prompt {
                config.insert("custom_prompt".to_string(), Value::String(prompt.to_string()));
            }
        }
        Self { strategy, config }
    }
}

/// Short-term store of raw turns for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemory {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<MemoryMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Strategy as sent, or as returned by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_term_memory_strategy: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkingMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            namespace: None,
            user_id: None,
            long_term_memory_strategy: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EqFilter {
    pub eq: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateFilter {
    pub gte: DateTime<Utc>,
}

/// Long-term memory search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<EqFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EqFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateFilter>,
    pub limit: usize,
    pub offset: usize,
    /// Maximum vector distance; similarity is `1 - distance`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub memories: Vec<MemoryRecordResult>,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryRecordResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub dist: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A recalled long-term memory with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryHit {
    pub text: String,
    pub score: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<MemoryRecordResult> for MemoryHit {
    fn from(record: MemoryRecordResult) -> Self {
        Self {
            text: record.text,
            score: (1.0 - record.dist).clamp(0.0, 1.0),
            created_at: record.created_at,
        }
    }
}

/// Server-side summary definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryView {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub time_window_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateSummaryView {
    pub name: String,
    pub source: String,
    pub group_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window_days: Option<u32>,
}

/// Summary of one concrete group of a view.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryPartition {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub memory_count: usize,
}

/// Handle for an asynchronous server task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskRef {
    pub id: String,
}
