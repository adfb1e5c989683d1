//! Memory hook configuration.
//!
//! Resolved once per invocation from environment variables and passed by
//! reference to every component.

use crate::error::{MemoryError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "AGENT_MEMORY_";

/// Long-term extraction strategy requested for captured turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    #[default]
    Discrete,
    Summary,
    Preferences,
    Custom,
}

impl FromStr for ExtractionStrategy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discrete" => Ok(Self::Discrete),
            "summary" => Ok(Self::Summary),
            "preferences" => Ok(Self::Preferences),
            "custom" => Ok(Self::Custom),
            other => Err(MemoryError::config(format!(
                "unknown extraction strategy {other:?} (expected discrete, summary, preferences or custom)"
            ))),
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discrete => "discrete",
            Self::Summary => "summary",
            Self::Preferences => "preferences",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    // Server connection
    pub server_url: String,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub timeout: Duration,

    // Identity inputs
    pub namespace: String,
    pub user_id: Option<String>,

    // Orchestrator switches
    pub auto_recall: bool,
    pub auto_capture: bool,
    pub track_tool_usage: bool,

    // Scoping and persistence
    pub use_workspace_namespace: bool,
    pub use_persistent_session: bool,

    // Summaries
    pub create_workspace_summary: bool,
    pub create_session_summary: bool,
    pub summary_time_window_days: u32,

    // Recall filtering
    pub min_score: f64,
    pub recall_limit: usize,

    // Extraction
    pub extraction_strategy: ExtractionStrategy,
    pub custom_prompt: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            api_key: None,
            bearer_token: None,
            timeout: Duration::from_millis(30_000),
            namespace: "augment".to_string(),
            user_id: None,
            auto_recall: true,
            auto_capture: true,
            track_tool_usage: false,
            use_workspace_namespace: true,
            use_persistent_session: true,
            create_workspace_summary: true,
            create_session_summary: true,
            summary_time_window_days: 30,
            min_score: 0.3,
            recall_limit: 5,
            extraction_strategy: ExtractionStrategy::Discrete,
            custom_prompt: None,
        }
    }
}

impl MemoryConfig {
    /// Load configuration from `AGENT_MEMORY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any name -> value lookup.
    ///
    /// The lookup receives full variable names such as
    /// `AGENT_MEMORY_NAMESPACE`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str, default: bool| match get(key) {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => default,
        };

        let defaults = Self::default();

        let timeout_ms: u64 = parse_number(get("TIMEOUT"), "TIMEOUT", 30_000)?;
        let min_score: f64 = parse_number(get("MIN_SCORE"), "MIN_SCORE", defaults.min_score)?;
        if !(0.0..=1.0).contains(&min_score) {
            return Err(MemoryError::config(format!(
                "{ENV_PREFIX}MIN_SCORE must be between 0 and 1, got {min_score}"
            )));
        }

        let extraction_strategy = match get("EXTRACTION_STRATEGY") {
            Some(value) => value.parse()?,
            None => defaults.extraction_strategy,
        };

        Ok(Self {
            server_url: get("SERVER_URL").unwrap_or(defaults.server_url),
            api_key: get("API_KEY"),
            bearer_token: get("BEARER_TOKEN"),
            timeout: Duration::from_millis(timeout_ms),
            namespace: get("NAMESPACE").unwrap_or(defaults.namespace),
            user_id: get("USER_ID"),
            auto_recall: flag("AUTO_RECALL", defaults.auto_recall),
            auto_capture: flag("AUTO_CAPTURE", defaults.auto_capture),
            track_tool_usage: flag("TRACK_TOOL_USAGE", defaults.track_tool_usage),
            use_workspace_namespace: flag(
                "USE_WORKSPACE_NAMESPACE",
                defaults.use_workspace_namespace,
            ),
            use_persistent_session: flag(
                "USE_PERSISTENT_SESSION",
                defaults.use_persistent_session,
            ),
            create_workspace_summary: flag(
                "CREATE_WORKSPACE_SUMMARY",
                defaults.create_workspace_summary,
            ),
            create_session_summary: flag(
                "CREATE_SESSION_SUMMARY",
                defaults.create_session_summary,
            ),
            summary_time_window_days: parse_number(
                get("SUMMARY_TIME_WINDOW_DAYS"),
                "SUMMARY_TIME_WINDOW_DAYS",
                defaults.summary_time_window_days,
            )?,
            min_score,
            recall_limit: parse_number(get("RECALL_LIMIT"), "RECALL_LIMIT", defaults.recall_limit)?,
            extraction_strategy,
            custom_prompt: get("CUSTOM_PROMPT"),
        })
    }

    /// Per-request timeout given the time left in the hook budget.
    pub fn request_timeout(&self, remaining: Duration) -> Duration {
        self.timeout.min(remaining)
    }
}

fn parse_number<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| MemoryError::config(format!("invalid {ENV_PREFIX}{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<MemoryConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MemoryConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, MemoryConfig::default());
        assert_eq!(config.server_url, "http://localhost:8000");
        assert_eq!(config.namespace, "augment");
        assert!(config.auto_capture && config.auto_recall);
        assert!(!config.track_tool_usage);
        assert_eq!(config.min_score, 0.3);
        assert_eq!(config.recall_limit, 5);
        assert_eq!(config.user_id, None);
    }

    #[test]
    fn test_load_overrides() {
        let config = load(&[
            ("AGENT_MEMORY_SERVER_URL", "http://test:8080"),
            ("AGENT_MEMORY_NAMESPACE", "test_namespace"),
            ("AGENT_MEMORY_USER_ID", "test_user"),
            ("AGENT_MEMORY_AUTO_CAPTURE", "false"),
            ("AGENT_MEMORY_TRACK_TOOL_USAGE", "TRUE"),
            ("AGENT_MEMORY_MIN_SCORE", "0.5"),
            ("AGENT_MEMORY_RECALL_LIMIT", "10"),
            ("AGENT_MEMORY_TIMEOUT", "1500"),
            ("AGENT_MEMORY_EXTRACTION_STRATEGY", "preferences"),
        ])
        .unwrap();

        assert_eq!(config.server_url, "http://test:8080");
        assert_eq!(config.namespace, "test_namespace");
        assert_eq!(config.user_id.as_deref(), Some("test_user"));
        assert!(!config.auto_capture);
        assert!(config.track_tool_usage);
        assert_eq!(config.min_score, 0.5);
        assert_eq!(config.recall_limit, 10);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.extraction_strategy, ExtractionStrategy::Preferences);
    }

    #[test]
    fn test_non_true_flag_is_false() {
        let config = load(&[("AGENT_MEMORY_AUTO_RECALL", "yes")]).unwrap();
        assert!(!config.auto_recall);
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        let config =
            load(&[("AGENT_MEMORY_NAMESPACE", ""), ("AGENT_MEMORY_USER_ID", " ")]).unwrap();
        assert_eq!(config.namespace, "augment");
        assert_eq!(config.user_id, None);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = load(&[("AGENT_MEMORY_RECALL_LIMIT", "many")]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("AGENT_MEMORY_RECALL_LIMIT"));

        assert!(load(&[("AGENT_MEMORY_MIN_SCORE", "1.5")]).is_err());
        assert!(load(&[("AGENT_MEMORY_EXTRACTION_STRATEGY", "magic")]).is_err());
    }

    #[test]
    fn test_request_timeout_is_bounded_by_budget() {
        let config = MemoryConfig::default();
        assert_eq!(
            config.request_timeout(Duration::from_secs(8)),
            Duration::from_secs(8)
        );
        let config = MemoryConfig {
            timeout: Duration::from_secs(2),
            ..MemoryConfig::default()
        };
        assert_eq!(
            config.request_timeout(Duration::from_secs(8)),
            Duration::from_secs(2)
        );
    }
}
