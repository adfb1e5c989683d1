//! End-of-turn capture into working memory.
//!
//! Capture is fire-and-forget: the turn is submitted to the session's
//! working memory, summary refreshes are requested, and any service error is
//! logged and swallowed.

use crate::client::MemoryService;
use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::identity::Identity;
use crate::schema::{MemoryMessage, Role, StrategyConfig, WorkingMemory};
use crate::summary::SummaryTarget;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One completed turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    pub prompt: Option<String>,
    pub response: Option<String>,
}

impl Turn {
    /// Build a turn from the host's prompt, prose response and code response.
    ///
    /// A code response given as a list of file changes is rendered as
    /// `[<changeType>: <path>]` lines; any other value is used as text.
    pub fn from_parts(prompt: Option<&str>, text: Option<&str>, code: Option<&Value>) -> Self {
        let mut response_parts: Vec<String> = Vec::new();
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            response_parts.push(text.to_string());
        }
        match code {
            Some(Value::Array(changes)) => {
                for change in changes {
                    if let Value::Object(change) = change {
                        let path = change.get("path").and_then(Value::as_str).unwrap_or("unknown");
                        let kind = change
                            .get("changeType")
                            .and_then(Value::as_str)
                            .unwrap_or("edit");
                        response_parts.push(format!("[{kind}: {path}]"));
                    }
                }
            }
            Some(Value::String(code)) if !code.trim().is_empty() => {
                response_parts.push(code.clone())
            }
            Some(Value::Null) | Some(Value::String(_)) | None => {}
            Some(other) => response_parts.push(other.to_string()),
        }

        Self {
            prompt: prompt
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
            response: (!response_parts.is_empty()).then(|| response_parts.join("\n\n")),
        }
    }

    /// Role-tagged messages for this turn, user first.
    pub fn messages(&self, now: DateTime<Utc>) -> Vec<MemoryMessage> {
        let mut messages = Vec::new();
        if let Some(prompt) = &self.prompt {
            messages.push(MemoryMessage::new(Role::User, prompt.clone(), now));
        }
        if let Some(response) = &self.response {
            messages.push(MemoryMessage::new(Role::Assistant, response.clone(), now));
        }
        messages
    }
}

/// What a capture achieved, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub messages_stored: usize,
    pub refreshes_requested: usize,
}

/// Submit the turn and request summary refreshes. Never fails.
pub fn capture(
    service: &dyn MemoryService,
    identity: &Identity,
    turn: &Turn,
    config: &MemoryConfig,
) -> CaptureOutcome {
    let mut outcome = CaptureOutcome::default();

    let messages = turn.messages(Utc::now());
    if messages.is_empty() {
        tracing::debug!("turn has no content; nothing to capture");
        return outcome;
    }

    match append_messages(service, identity, config, messages) {
        Ok(stored) => outcome.messages_stored = stored,
        Err(e) => {
            tracing::warn!(session = %identity.session, error = %e, "turn capture lost");
            return outcome;
        }
    }

    for target in SummaryTarget::enabled(identity, config) {
        match target.refresh(service, config) {
            Ok(_) => outcome.refreshes_requested += 1,
            Err(e) => {
                tracing::warn!(scope = target.scope.label(), error = %e, "summary refresh failed");
            }
        }
    }

    tracing::info!(
        namespace = %identity.namespace,
        session = %identity.session,
        messages = outcome.messages_stored,
        refreshes = outcome.refreshes_requested,
        "turn captured"
    );
    outcome
}

/// Writes attempted before an append gives up.
const APPEND_ATTEMPTS: usize = 3;

/// Append messages to the end of the session's working memory.
///
/// Reads what the server holds (absent means empty), adds the messages
/// after it and writes the result back. The write is then read back; if a
/// concurrent writer replaced it, the messages that went missing are
/// appended again to the newer state, up to `APPEND_ATTEMPTS` writes.
/// Returns the number appended.
pub fn append_messages(
    service: &dyn MemoryService,
    identity: &Identity,
    config: &MemoryConfig,
    messages: Vec<MemoryMessage>,
) -> Result<usize> {
    let session_id = identity.session.as_str();
    let namespace = identity.namespace.as_str();
    let user_id = config.user_id.as_deref();
    let strategy =
        StrategyConfig::new(config.extraction_strategy, config.custom_prompt.as_deref());
    let count = messages.len();

    let mut current = service.get_working_memory(session_id, Some(namespace), user_id)?;
    for attempt in 1..=APPEND_ATTEMPTS {
        let mut memory = current.unwrap_or_else(|| WorkingMemory::new(session_id));
        memory.namespace = Some(namespace.to_string());
        if user_id.is_some() {
            memory.user_id = user_id.map(str::to_string);
        }
        memory.long_term_memory_strategy = serde_json::to_value(&strategy).ok();

        let missing: Vec<MemoryMessage> = messages
            .iter()
            .filter(|m| !memory.messages.iter().any(|held| held.id == m.id))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(count);
        }
        memory.messages.extend(missing);
        service.put_working_memory(&memory)?;

        current = service.get_working_memory(session_id, Some(namespace), user_id)?;
        let stored = current.as_ref().map(|m| m.messages.as_slice()).unwrap_or(&[]);
        if messages.iter().all(|m| stored.iter().any(|held| held.id == m.id)) {
            return Ok(count);
        }
        tracing::debug!(
            session = session_id,
            attempt,
            "working memory overwritten; appending again"
        );
    }

    Err(MemoryError::unavailable(
        "append working memory",
        format!("messages still missing after {APPEND_ATTEMPTS} writes"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionStrategy;
    use crate::identity::resolve_identity;
    use crate::testing::FakeService;
    use serde_json::json;

    fn identity() -> Identity {
        resolve_identity(
            &MemoryConfig::default(),
            &["/nonexistent/my-project".to_string()],
            Some("conv-1"),
        )
        .unwrap()
    }

    fn turn(prompt: &str, response: &str) -> Turn {
        Turn::from_parts(Some(prompt), Some(response), None)
    }

    #[test]
    fn test_turn_messages() {
        let messages =
            turn("How do I use Redis?", "Redis is an in-memory data store").messages(Utc::now());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "How do I use Redis?");
        assert_eq!(messages[1].role, "assistant");
        assert!(messages.iter().all(|m| m.created_at.is_some() && !m.id.is_empty()));
        assert_ne!(messages[0].id, messages[1].id);
    }

    #[test]
    fn test_prompt_only_turn() {
        let messages = Turn::from_parts(Some("Hello"), None, None).messages(Utc::now());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_code_response_forms() {
        let code = json!("code_answer()");
        let text_code = Turn::from_parts(Some("q"), Some("Text answer"), Some(&code));
        let response = text_code.response.unwrap();
        assert!(response.contains("Text answer"));
        assert!(response.contains("code_answer()"));

        let changes = json!([
            {"path": "src/db.rs", "changeType": "edit"},
            {"path": "src/new.rs", "changeType": "create"},
            "ignored"
        ]);
        let listed = Turn::from_parts(None, None, Some(&changes));
        assert_eq!(listed.response.as_deref(), Some("[edit: src/db.rs]\n\n[create: src/new.rs]"));
    }

    #[test]
    fn test_empty_turn_makes_no_calls() {
        let service = FakeService::new();
        let outcome = capture(&service, &identity(), &Turn::default(), &MemoryConfig::default());
        assert_eq!(outcome, CaptureOutcome::default());
        assert_eq!(service.put_count(), 0);
    }

    #[test]
    fn test_capture_appends_and_refreshes() {
        let identity = identity();
        let session = identity.session.to_string();
        let mut existing = WorkingMemory::new(session.clone());
        existing.messages.push(MemoryMessage::new(Role::User, "earlier", Utc::now()));
        let service = FakeService::new().with_working_memory(existing);

        let outcome =
            capture(&service, &identity, &turn("now", "answer"), &MemoryConfig::default());
        assert_eq!(outcome.messages_stored, 2);
        assert_eq!(outcome.refreshes_requested, 2);
        assert_eq!(service.refreshed().len(), 2);

        let stored = service.working_memory(&session).unwrap();
        let contents: Vec<&str> = stored.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["earlier", "now", "answer"]);
        assert_eq!(stored.namespace.as_deref(), Some(identity.namespace.as_str()));
    }

    #[test]
    fn test_two_captures_both_append() {
        let identity = identity();
        let service = FakeService::new();
        let config = MemoryConfig {
            create_workspace_summary: false,
            create_session_summary: false,
            ..MemoryConfig::default()
        };
        capture(&service, &identity, &turn("one", "1"), &config);
        capture(&service, &identity, &turn("two", "2"), &config);

        let stored = service.working_memory(identity.session.as_str()).unwrap();
        assert_eq!(stored.messages.len(), 4);
        assert!(service.refreshed().is_empty());
    }

    #[test]
    fn test_strategy_and_user_are_sent() {
        let identity = identity();
        let service = FakeService::new();
        let config = MemoryConfig {
            user_id: Some("alice".to_string()),
            extraction_strategy: ExtractionStrategy::Custom,
            custom_prompt: Some("only decisions".to_string()),
            ..MemoryConfig::default()
        };
        capture(&service, &identity, &turn("q", "a"), &config);

        let stored = service.working_memory(identity.session.as_str()).unwrap();
        assert_eq!(stored.user_id.as_deref(), Some("alice"));
        assert_eq!(
            stored.long_term_memory_strategy,
            Some(json!({"strategy": "custom", "config": {"custom_prompt": "only decisions"}}))
        );
    }

    #[test]
    fn test_outage_is_swallowed() {
        let service = FakeService::down();
        let outcome = capture(&service, &identity(), &turn("q", "a"), &MemoryConfig::default());
        assert_eq!(outcome, CaptureOutcome::default());
    }

    #[test]
    fn test_overlapping_captures_both_append() {
        let identity = identity();
        let session = identity.session.to_string();
        let config = MemoryConfig {
            create_workspace_summary: false,
            create_session_summary: false,
            ..MemoryConfig::default()
        };

        // The other capture read the same empty state and wrote after us.
        let other_turn = turn("two", "2").messages(Utc::now());
        let mut other = WorkingMemory::new(session.clone());
        other.messages = other_turn.clone();
        let service = FakeService::new().with_racing_write(other);

        let outcome = capture(&service, &identity, &turn("one", "1"), &config);
        assert_eq!(outcome.messages_stored, 2);

        let stored = service.working_memory(&session).unwrap();
        let contents: Vec<&str> = stored.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "2", "one", "1"]);
        assert_eq!(service.put_count(), 2);

        // The other writer's read-back finds its messages and writes nothing.
        assert_eq!(append_messages(&service, &identity, &config, other_turn).unwrap(), 2);
        assert_eq!(service.put_count(), 2);
        assert_eq!(service.working_memory(&session).unwrap().messages.len(), 4);
    }

    #[test]
    fn test_append_gives_up_when_always_overwritten() {
        let identity = identity();
        let session = identity.session.to_string();
        let mut service = FakeService::new();
        for _ in 0..APPEND_ATTEMPTS {
            service = service.with_racing_write(WorkingMemory::new(session.clone()));
        }

        let messages = turn("lost", "gone").messages(Utc::now());
        let err =
            append_messages(&service, &identity, &MemoryConfig::default(), messages).unwrap_err();
        assert!(matches!(err, MemoryError::ServiceUnavailable { .. }));
        assert_eq!(service.put_count(), APPEND_ATTEMPTS);
    }
}
