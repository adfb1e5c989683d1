//! Common utilities for memory hooks.
//!
//! This crate provides the protocol boundary shared by every hook binary:
//! - JSON input parsing from stdin
//! - Text/JSON output to stdout
//! - Registered events and their timeout budgets
//! - Diagnostic logging to stderr

pub mod event;
pub mod input;
pub mod logging;
pub mod output;

pub use event::HookEvent;
pub use input::{Conversation, FileChange, HookInput, ToolInput};
pub use output::HookOutput;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::event::HookEvent;
    pub use crate::input::{Conversation, FileChange, HookInput, ToolInput};
    pub use crate::output::HookOutput;
    pub use anyhow::{Context, Result};
    pub use serde::{Deserialize, Serialize};
}
