//! Diagnostic logging for hooks.
//!
//! Stdout is the protocol channel, so every diagnostic goes to stderr. The
//! installed wrapper scripts append stderr to the hooks log file.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "AGENT_MEMORY_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install the stderr subscriber for this process.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(hook_name: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(hook = hook_name, pid = std::process::id(), "hook started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init("test-hook");
        init("test-hook");
        tracing::info!("still logging");
    }
}
