//! Error taxonomy for memory hooks.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Invalid or missing required input. Fatal to the invocation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The memory service could not be reached or answered with an error.
    /// Never fatal to a hook.
    #[error("memory service unavailable during {operation}: {reason}")]
    ServiceUnavailable {
        operation: &'static str,
        reason: String,
    },
}

impl MemoryError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unavailable(operation: &'static str, reason: impl ToString) -> Self {
        Self::ServiceUnavailable {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Keep configuration errors, turn an outage into `None`.
pub fn tolerate_outage<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_configuration() => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "memory service unavailable; continuing without it");
            Ok(None)
        }
    }
}
