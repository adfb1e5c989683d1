//! Hook input parsing from stdin.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Read};

/// Main hook input structure received from the host CLI.
///
/// One shape covers every event; fields that an event does not carry are
/// left at their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    /// Hook event name (e.g., "SessionStart", "Stop", "PostToolUse")
    #[serde(default)]
    pub hook_event_name: Option<String>,

    /// Host conversation identifier, stable for one conversation
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// Workspace roots open in the host, primary root first
    #[serde(default)]
    pub workspace_roots: Vec<String>,

    /// Conversation data for the finished turn (Stop hooks)
    #[serde(default)]
    pub conversation: Option<Conversation>,

    /// The name of the tool that ran (PostToolUse hooks)
    #[serde(default)]
    pub tool_name: String,

    /// Tool-specific input parameters
    #[serde(default)]
    pub tool_input: ToolInput,

    /// Tool error message, if the tool failed
    #[serde(default)]
    pub tool_error: Option<String>,

    /// Files changed by the tool
    #[serde(default)]
    pub file_changes: Vec<FileChange>,

    /// Additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One completed turn as reported by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Prompt the user submitted
    #[serde(default)]
    pub user_prompt: Option<String>,

    /// Prose part of the agent response
    #[serde(default)]
    pub agent_text_response: Option<String>,

    /// Code part of the agent response: either a list of file changes or
    /// free-form text
    #[serde(default)]
    pub agent_code_response: Option<serde_json::Value>,
}

/// A file touched by a tool or an agent response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub change_type: Option<String>,
}

/// Tool input parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInput {
    /// Command for process-launching tools
    #[serde(default)]
    pub command: Option<String>,

    /// File or API path for editing and API tools
    #[serde(default)]
    pub path: Option<String>,

    /// HTTP method for API tools
    #[serde(default)]
    pub method: Option<String>,

    /// Additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl HookInput {
    /// Parse hook input, treating empty or malformed text as absent.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(text) {
            Ok(input) => Some(input),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed hook input");
                None
            }
        }
    }

    /// Read a reader to the end and parse it leniently.
    pub fn read_lenient(mut reader: impl Read) -> Option<Self> {
        let mut text = String::new();
        if let Err(e) = reader.read_to_string(&mut text) {
            tracing::warn!(error = %e, "failed to read hook input");
            return None;
        }
        Self::parse_lenient(&text)
    }

    /// Read stdin and parse it leniently.
    pub fn read_stdin_lenient() -> Option<Self> {
        Self::read_lenient(io::stdin().lock())
    }

    /// Host-supplied conversation token, if non-blank.
    pub fn conversation_token(&self) -> Option<&str> {
        self.conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Get the command if the tool launched a process.
    pub fn get_command(&self) -> Option<&str> {
        self.tool_input.command.as_deref()
    }

    /// Get the tool path if applicable.
    pub fn get_path(&self) -> Option<&str> {
        self.tool_input.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_start_input() {
        let json = r#"{
            "hook_event_name": "SessionStart",
            "conversation_id": "conv-1",
            "workspace_roots": ["/work/project", "/work/other"]
        }"#;
        let input: HookInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.hook_event_name.as_deref(), Some("SessionStart"));
        assert_eq!(input.workspace_roots[0], "/work/project");
        assert_eq!(input.conversation_token(), Some("conv-1"));
    }

    #[test]
    fn test_parse_stop_input() {
        let json = r#"{
            "conversation": {
                "userPrompt": "How do I use Redis?",
                "agentTextResponse": "Redis is an in-memory data store",
                "agentCodeResponse": [{"path": "src/db.rs", "changeType": "edit"}]
            }
        }"#;
        let input: HookInput = serde_json::from_str(json).unwrap();
        let conversation = input.conversation.unwrap();
        assert_eq!(conversation.user_prompt.as_deref(), Some("How do I use Redis?"));
        assert!(conversation.agent_code_response.unwrap().is_array());
    }

    #[test]
    fn test_parse_tool_input() {
        let json = r#"{
            "tool_name": "launch-process",
            "tool_input": {"command": "cargo test", "cwd": "/work"},
            "file_changes": [{"path": "a.rs", "changeType": "create"}]
        }"#;
        let input: HookInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.get_command(), Some("cargo test"));
        assert!(input.tool_input.extra.contains_key("cwd"));
        assert_eq!(input.file_changes[0].change_type.as_deref(), Some("create"));
    }

    #[test]
    fn test_lenient_parse_rejects_garbage() {
        assert!(HookInput::parse_lenient("").is_none());
        assert!(HookInput::parse_lenient("   \n").is_none());
        assert!(HookInput::parse_lenient("{not json").is_none());
        assert!(HookInput::parse_lenient("{}").is_some());
    }

    #[test]
    fn test_blank_conversation_token_is_absent() {
        let input: HookInput = serde_json::from_str(r#"{"conversation_id": "  "}"#).unwrap();
        assert_eq!(input.conversation_token(), None);
    }

    #[test]
    fn test_read_lenient() {
        let input = HookInput::read_lenient(r#"{"tool_name": "view"}"#.as_bytes()).unwrap();
        assert_eq!(input.tool_name, "view");
        assert!(HookInput::read_lenient(&[0xff, 0xfe][..]).is_none());
    }
}
