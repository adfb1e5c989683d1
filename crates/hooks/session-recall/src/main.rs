//! SessionStart hook: inject recalled workspace memory.
//!
//! Prints the recalled context block, or `{}` when recall is disabled or
//! nothing was found. Service outages never fail the hook.

use hook_common::prelude::*;
use hook_memory::{HttpMemoryClient, MemoryConfig, recall_context, resolve_identity};

const EVENT: HookEvent = HookEvent::SessionStart;

fn main() -> Result<()> {
    hook_common::logging::init("session-recall");

    let config = MemoryConfig::from_env()?;
    if !config.auto_recall {
        tracing::debug!("auto recall disabled");
        return HookOutput::empty().write_stdout();
    }

    let input = HookInput::read_stdin_lenient().unwrap_or_default();
    let identity =
        resolve_identity(&config, &input.workspace_roots, input.conversation_token())?;
    let Some(client) = HttpMemoryClient::connect(&config, EVENT.budget())? else {
        return HookOutput::empty().write_stdout();
    };

    let context = recall_context(&client, &identity, &config);
    HookOutput::context(context).write_stdout()
}
