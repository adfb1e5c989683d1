//! Memory system for the session hooks.
//!
//! Provides:
//! - Configuration resolved from the environment
//! - Workspace, namespace and session identifiers
//! - A client for the memory service
//! - Recall at session start and capture at end of turn
//! - Tool-usage tracking

pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod recall;
pub mod schema;
pub mod summary;
pub mod tools;

#[cfg(test)]
mod testing;

pub use capture::{CaptureOutcome, Turn, append_messages, capture};
pub use client::{HttpMemoryClient, MemoryService};
pub use config::{ExtractionStrategy, MemoryConfig};
pub use error::{MemoryError, Result, tolerate_outage};
pub use identity::{Identity, NamespaceId, SessionId, Workspace, resolve_identity};
pub use recall::{RecallResult, recall, recall_context};
pub use schema::{MemoryHit, MemoryMessage, Role};
pub use tools::{ToolUse, describe_tool_use, track_tool_use};
