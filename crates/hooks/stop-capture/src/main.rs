//! Stop hook: capture the finished turn into working memory.

use hook_common::prelude::*;
use hook_memory::{HttpMemoryClient, MemoryConfig, Turn, capture, resolve_identity};

const EVENT: HookEvent = HookEvent::Stop;

fn main() -> Result<()> {
    hook_common::logging::init("stop-capture");

    let config = MemoryConfig::from_env()?;
    if !config.auto_capture {
        tracing::debug!("auto capture disabled");
        return HookOutput::empty().write_stdout();
    }

    let input = HookInput::read_stdin_lenient().unwrap_or_default();
    let Some(conversation) = &input.conversation else {
        tracing::debug!("no conversation data in hook input");
        return HookOutput::empty().write_stdout();
    };

    let turn = Turn::from_parts(
        conversation.user_prompt.as_deref(),
        conversation.agent_text_response.as_deref(),
        conversation.agent_code_response.as_ref(),
    );
    if turn == Turn::default() {
        return HookOutput::empty().write_stdout();
    }

    let identity =
        resolve_identity(&config, &input.workspace_roots, input.conversation_token())?;
    if let Some(client) = HttpMemoryClient::connect(&config, EVENT.budget())? {
        capture(&client, &identity, &turn, &config);
    }

    HookOutput::empty().write_stdout()
}
