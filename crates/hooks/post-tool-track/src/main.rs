//! PostToolUse hook: record tool usage in the session's working memory.
//!
//! Runs only when tool tracking is enabled. Always prints `{}`.

use hook_common::prelude::*;
use hook_memory::{
    HttpMemoryClient, MemoryConfig, ToolUse, resolve_identity, track_tool_use,
};

const EVENT: HookEvent = HookEvent::PostToolUse;

fn main() -> Result<()> {
    hook_common::logging::init("post-tool-track");

    let config = MemoryConfig::from_env()?;
    if !config.track_tool_usage {
        return HookOutput::empty().write_stdout();
    }

    let Some(input) = HookInput::read_stdin_lenient() else {
        return HookOutput::empty().write_stdout();
    };

    let tool = tool_use(&input);
    if hook_memory::describe_tool_use(&tool).is_some() {
        let identity =
            resolve_identity(&config, &input.workspace_roots, input.conversation_token())?;
        if let Some(client) = HttpMemoryClient::connect(&config, EVENT.budget())? {
            track_tool_use(&client, &identity, &config, &tool);
        }
    }

    HookOutput::empty().write_stdout()
}

fn tool_use(input: &HookInput) -> ToolUse {
    ToolUse {
        name: input.tool_name.clone(),
        command: input.get_command().map(str::to_string),
        path: input.get_path().map(str::to_string),
        method: input.tool_input.method.clone(),
        changes: input
            .file_changes
            .iter()
            .map(|change| (change.change_type.clone(), change.path.clone()))
            .collect(),
        error: input.tool_error.clone(),
    }
}
