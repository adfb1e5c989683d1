use assert_cmd::Command;
use predicates::prelude::*;

const UNREACHABLE: &str = "http://127.0.0.1:9";

fn hook() -> Command {
    let mut cmd = Command::cargo_bin("stop-capture").unwrap();
    cmd.env("AGENT_MEMORY_SERVER_URL", UNREACHABLE)
        .env("AGENT_MEMORY_TIMEOUT", "500")
        .env_remove("AGENT_MEMORY_AUTO_CAPTURE")
        .env_remove("AGENT_MEMORY_EXTRACTION_STRATEGY");
    cmd
}

const TURN: &str = r#"{
    "hook_event_name": "Stop",
    "conversation_id": "conv-1",
    "workspace_roots": ["/nonexistent/project"],
    "conversation": {
        "userPrompt": "How do I use Redis?",
        "agentTextResponse": "Redis is an in-memory data store",
        "agentCodeResponse": [{"path": "src/db.rs", "changeType": "edit"}]
    }
}"#;

#[test]
fn test_capture_survives_outage() {
    hook().write_stdin(TURN).assert().success().stdout("{}\n");
}

#[test]
fn test_missing_conversation_is_noop() {
    hook()
        .write_stdin(r#"{"hook_event_name": "Stop"}"#)
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn test_disabled_capture() {
    hook()
        .env("AGENT_MEMORY_AUTO_CAPTURE", "false")
        .write_stdin(TURN)
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn test_unknown_strategy_fails() {
    hook()
        .env("AGENT_MEMORY_EXTRACTION_STRATEGY", "magic")
        .write_stdin(TURN)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}
