//! Wrapper scripts registered with the host.
//!
//! Each script execs one hook binary and appends its stderr to a shared
//! log file next to the scripts, so hook diagnostics never reach the host.

use hook_common::HookEvent;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const LOG_FILE: &str = "hooks.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookScript {
    pub event: HookEvent,
    pub file_name: &'static str,
    pub binary: &'static str,
}

pub const SCRIPTS: [HookScript; 3] = [
    HookScript {
        event: HookEvent::SessionStart,
        file_name: "session_start.sh",
        binary: "session-recall",
    },
    HookScript {
        event: HookEvent::Stop,
        file_name: "stop.sh",
        binary: "stop-capture",
    },
    HookScript {
        event: HookEvent::PostToolUse,
        file_name: "post_tool_use.sh",
        binary: "post-tool-track",
    },
];

/// How a script finds its binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryLocation {
    Dir(PathBuf),
    OnPath,
}

impl BinaryLocation {
    fn invocation(&self, binary: &str) -> String {
        match self {
            Self::Dir(dir) => shell_quote(&dir.join(binary).to_string_lossy()),
            Self::OnPath => binary.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenScript {
    pub script: HookScript,
    pub path: PathBuf,
    /// False when the file already had this exact content
    pub changed: bool,
}

impl HookScript {
    pub fn contents(&self, location: &BinaryLocation, log_file: &Path) -> String {
        format!(
            "#!/bin/sh\n# Agent memory {} hook\nexec {} 2>>{}\n",
            self.event,
            location.invocation(self.binary),
            shell_quote(&log_file.to_string_lossy()),
        )
    }
}

/// Write every wrapper script into `hooks_dir`, leaving unchanged files alone.
pub fn write_scripts(
    hooks_dir: &Path,
    location: &BinaryLocation,
    dry_run: bool,
) -> io::Result<Vec<WrittenScript>> {
    if !dry_run {
        fs::create_dir_all(hooks_dir)?;
    }
    let log_file = hooks_dir.join(LOG_FILE);

    let mut written = Vec::with_capacity(SCRIPTS.len());
    for script in SCRIPTS {
        let path = hooks_dir.join(script.file_name);
        let contents = script.contents(location, &log_file);
        let changed = match fs::read_to_string(&path) {
            Ok(existing) => existing != contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(e),
        };

        if changed && !dry_run {
            fs::write(&path, &contents)?;
            make_executable(&path)?;
            tracing::debug!(path = %path.display(), "wrote hook script");
        }
        written.push(WrittenScript {
            script,
            path,
            changed,
        });
    }
    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Single-quote for POSIX sh.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
