//! Tool-usage tracking.

use crate::capture::append_messages;
use crate::client::MemoryService;
use crate::config::MemoryConfig;
use crate::identity::Identity;
use crate::schema::{MemoryMessage, Role};
use chrono::Utc;

// Read-only tools add nothing worth remembering
const SKIP_TOOLS: &[&str] = &["view", "codebase-retrieval", "web-search", "web-fetch"];

const MAX_COMMAND_CHARS: usize = 200;
const MAX_ERROR_CHARS: usize = 100;
const MAX_CHANGES: usize = 5;

/// One tool invocation as reported by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolUse {
    pub name: String,
    pub command: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
    /// `(change type, path)` pairs
    pub changes: Vec<(Option<String>, Option<String>)>,
    pub error: Option<String>,
}

/// One-line description of a tool use, or `None` for skipped tools.
pub fn describe_tool_use(tool: &ToolUse) -> Option<String> {
    let name = if tool.name.trim().is_empty() { "unknown" } else { tool.name.as_str() };
    if SKIP_TOOLS.contains(&name) {
        return None;
    }

    let mut parts = vec![format!("Used tool: {name}")];

    match name {
        "launch-process" => {
            if let Some(command) = non_blank(&tool.command) {
                parts.push(format!("Command: {}", truncate_chars(command, MAX_COMMAND_CHARS)));
            }
        }
        "str-replace-editor" | "save-file" => {
            if let Some(path) = non_blank(&tool.path) {
                parts.push(format!("File: {path}"));
            }
        }
        "github-api" => {
            if let Some(path) = non_blank(&tool.path) {
                let method = non_blank(&tool.method).unwrap_or("GET");
                parts.push(format!("GitHub: {method} {path}"));
            }
        }
        _ => {}
    }

    let changes: Vec<String> = tool
        .changes
        .iter()
        .take(MAX_CHANGES)
        .map(|(kind, path)| {
            format!(
                "{}: {}",
                kind.as_deref().unwrap_or("edit"),
                path.as_deref().unwrap_or("unknown")
            )
        })
        .collect();
    if !changes.is_empty() {
        parts.push(format!("Changes: {}", changes.join(", ")));
    }

    if let Some(error) = non_blank(&tool.error) {
        parts.push(format!("Error: {}", truncate_chars(error, MAX_ERROR_CHARS)));
    }

    Some(parts.join(" | "))
}

/// Append the tool description to the session's working memory.
///
/// Returns whether a message was stored; failures are logged and swallowed.
pub fn track_tool_use(
    service: &dyn MemoryService,
    identity: &Identity,
    config: &MemoryConfig,
    tool: &ToolUse,
) -> bool {
    let Some(description) = describe_tool_use(tool) else {
        tracing::debug!(tool = %tool.name, "tool skipped");
        return false;
    };

    let message = MemoryMessage::new(Role::System, description, Utc::now());
    match append_messages(service, identity, config, vec![message]) {
        Ok(_) => {
            tracing::info!(tool = %tool.name, session = %identity.session, "tool use recorded");
            true
        }
        Err(e) => {
            tracing::warn!(tool = %tool.name, error = %e, "tool use not recorded");
            false
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}
