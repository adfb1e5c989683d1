//! Install flow: scripts first, then the settings merge.

use crate::scripts::{self, BinaryLocation, WrittenScript};
use crate::settings::{self, HookDefinition};
use anyhow::{Context, Result};
use hook_common::HookEvent;
use serde_json::Value;
use std::path::{Path, PathBuf};

const HOST_DIR: &str = ".augment";

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub settings_path: PathBuf,
    pub hooks_dir: PathBuf,
    pub binaries: BinaryLocation,
    pub tool_tracking: bool,
    pub dry_run: bool,
}

impl InstallOptions {
    /// `~/.augment/settings.json` and `~/.augment/memory-hooks`.
    pub fn default_paths() -> Result<(PathBuf, PathBuf)> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        let host = home.join(HOST_DIR);
        Ok((host.join("settings.json"), host.join("memory-hooks")))
    }

    /// Directory holding the running installer, where the hook binaries
    /// are installed alongside it.
    pub fn own_bin_dir() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Failed to locate installer executable")?;
        exe.parent()
            .map(Path::to_path_buf)
            .context("Installer executable has no parent directory")
    }
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub scripts: Vec<WrittenScript>,
    pub hooks: Vec<HookDefinition>,
    /// Whether the settings document differs from what was on disk
    pub settings_changed: bool,
    pub dry_run: bool,
}

/// Hooks to register for the written scripts.
pub fn desired_hooks(scripts: &[WrittenScript], tool_tracking: bool) -> Vec<HookDefinition> {
    scripts
        .iter()
        .filter(|written| tool_tracking || written.script.event != HookEvent::PostToolUse)
        .map(|written| {
            let event = written.script.event;
            let def = HookDefinition::new(
                event.as_str(),
                written.path.to_string_lossy(),
                event.timeout_ms(),
            );
            match event {
                HookEvent::SessionStart => def,
                HookEvent::Stop => def.with_metadata("includeConversationData", Value::Bool(true)),
                HookEvent::PostToolUse => def.with_matcher(".*"),
            }
        })
        .collect()
}

pub fn run_install(options: &InstallOptions) -> Result<InstallReport> {
    // A malformed settings file aborts before anything is written.
    let document = settings::load_settings(&options.settings_path)?;

    let scripts = scripts::write_scripts(&options.hooks_dir, &options.binaries, options.dry_run)
        .with_context(|| {
            format!("Failed to write hook scripts to {}", options.hooks_dir.display())
        })?;

    let hooks = desired_hooks(&scripts, options.tool_tracking);
    let (document, settings_changed) = settings::merge(document, &hooks);

    if settings_changed && !options.dry_run {
        settings::save_settings(&options.settings_path, &document)?;
        tracing::info!(path = %options.settings_path.display(), "settings updated");
    }

    Ok(InstallReport {
        scripts,
        hooks,
        settings_changed,
        dry_run: options.dry_run,
    })
}
