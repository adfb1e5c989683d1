//! Hook events this plugin registers with the host.

use std::fmt;
use std::time::Duration;

/// Share of the host timeout a hook may spend on network calls.
const BUDGET_PERCENT: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Start of a session; the hook may print context to inject
    SessionStart,
    /// End of a turn; the hook captures the turn
    Stop,
    /// After each tool call; the hook records tool usage
    PostToolUse,
}

impl HookEvent {
    pub const ALL: [HookEvent; 3] = [Self::SessionStart, Self::Stop, Self::PostToolUse];

    /// Event key in the host settings document.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::Stop => "Stop",
            Self::PostToolUse => "PostToolUse",
        }
    }

    /// Timeout registered with the host, in milliseconds.
    pub fn timeout_ms(self) -> u64 {
        match self {
            Self::SessionStart | Self::Stop => 10_000,
            Self::PostToolUse => 5_000,
        }
    }

    /// Time the hook may spend talking to the memory service.
    pub fn budget(self) -> Duration {
        Duration::from_millis(self.timeout_ms()) * BUDGET_PERCENT / 100
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_is_below_host_timeout() {
        for event in HookEvent::ALL {
            assert!(event.budget() < Duration::from_millis(event.timeout_ms()));
        }
        assert_eq!(HookEvent::PostToolUse.budget(), Duration::from_millis(4_000));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(HookEvent::SessionStart.to_string(), "SessionStart");
        assert_eq!(HookEvent::Stop.as_str(), "Stop");
    }
}
