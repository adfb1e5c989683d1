//! Registers the memory hooks with the host CLI.
//!
//! - Wrapper scripts under the hooks directory
//! - An idempotent merge into the host settings document

pub mod install;
pub mod scripts;
pub mod settings;

pub use install::{InstallOptions, InstallReport, desired_hooks, run_install};
pub use scripts::{BinaryLocation, HookScript, SCRIPTS, WrittenScript, write_scripts};
pub use settings::{
    HookDefinition, HookEntry, SettingsDocument, SettingsError, SettingsFormatError, load_settings,
    merge, save_settings,
};
