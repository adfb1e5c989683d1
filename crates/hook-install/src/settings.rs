//! Host settings document and the idempotent hook merge.
//!
//! The document is held as a typed tree: event name -> ordered hook-group
//! entries. Entries read from disk keep their original JSON value, so
//! anything the merge does not touch serializes back unchanged.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const HOOKS_KEY: &str = "hooks";

/// The existing document cannot be understood; it must not be overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("settings document is malformed: {0}")]
pub struct SettingsFormatError(String);

impl SettingsFormatError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Format(#[from] SettingsFormatError),

    #[error("failed to access settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SettingsError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A hook this installer wants registered.
#[derive(Debug, Clone, PartialEq)]
pub struct HookDefinition {
    pub event: String,
    pub command: String,
    pub timeout_ms: u64,
    pub matcher: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl HookDefinition {
    pub fn new(event: impl Into<String>, command: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            event: event.into(),
            command: command.into(),
            timeout_ms,
            matcher: None,
            metadata: None,
        }
    }

    pub fn with_matcher(mut self, matcher: impl Into<String>) -> Self {
        self.matcher = Some(matcher.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

#[derive(Serialize)]
struct HookGroup<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    matcher: Option<&'a str>,
    hooks: [HookCommand<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Map<String, Value>>,
}

#[derive(Serialize)]
struct HookCommand<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    command: &'a str,
    timeout: u64,
}

/// Where a command path was found inside an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CommandSlot {
    /// `hooks[index].command`
    Nested { index: usize, timeout: Option<u64> },
    /// Legacy `{"path": ...}` entry
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandRef {
    command: String,
    slot: CommandSlot,
}

/// One hook-group entry of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct HookEntry {
    value: Map<String, Value>,
    commands: Vec<CommandRef>,
}

impl HookEntry {
    fn parse(value: Map<String, Value>, at: &str) -> Result<Self, SettingsFormatError> {
        let mut commands = Vec::new();

        match value.get("path") {
            None => {}
            Some(Value::String(path)) => commands.push(CommandRef {
                command: path.clone(),
                slot: CommandSlot::Legacy,
            }),
            Some(_) => {
                return Err(SettingsFormatError::new(format!("{at}.path is not a string")));
            }
        }

        match value.get(HOOKS_KEY) {
            None => {}
            Some(Value::Array(hooks)) => {
                for (index, hook) in hooks.iter().enumerate() {
                    let hook = hook.as_object().ok_or_else(|| {
                        SettingsFormatError::new(format!("{at}.hooks[{index}] is not an object"))
                    })?;
                    match hook.get("command") {
                        None => {}
                        Some(Value::String(command)) => commands.push(CommandRef {
                            command: command.clone(),
                            slot: CommandSlot::Nested {
                                index,
                                timeout: hook.get("timeout").and_then(Value::as_u64),
                            },
                        }),
                        Some(_) => {
                            return Err(SettingsFormatError::new(format!(
                                "{at}.hooks[{index}].command is not a string"
                            )));
                        }
                    }
                }
            }
            Some(_) => {
                return Err(SettingsFormatError::new(format!("{at}.hooks is not a list")));
            }
        }

        Ok(Self { value, commands })
    }

    fn from_definition(def: &HookDefinition) -> Self {
        let group = HookGroup {
            matcher: def.matcher.as_deref(),
            hooks: [HookCommand {
                kind: "command",
                command: &def.command,
                timeout: def.timeout_ms,
            }],
            metadata: def.metadata.as_ref(),
        };
        let value = match serde_json::to_value(group) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            value,
            commands: vec![CommandRef {
                command: def.command.clone(),
                slot: CommandSlot::Nested {
                    index: 0,
                    timeout: Some(def.timeout_ms),
                },
            }],
        }
    }

    /// Command paths registered by this entry, in order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.command.as_str())
    }

    fn set_timeout(&mut self, slot: usize, timeout_ms: u64) {
        let CommandSlot::Nested { index, timeout } = &mut self.commands[slot].slot else {
            return;
        };
        if let Some(Value::Object(hook)) = self
            .value
            .get_mut(HOOKS_KEY)
            .and_then(Value::as_array_mut)
            .and_then(|hooks| hooks.get_mut(*index))
        {
            hook.insert("timeout".to_string(), Value::from(timeout_ms));
            *timeout = Some(timeout_ms);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct EventHooks {
    name: String,
    entries: Vec<HookEntry>,
}

/// The host settings document.
///
/// Two documents are equal when they serialize to the same JSON.
#[derive(Debug, Clone, Default)]
pub struct SettingsDocument {
    /// Every top-level key; `hooks`, when present, holds a null placeholder
    /// marking its position
    root: Map<String, Value>,
    events: Vec<EventHooks>,
}

impl PartialEq for SettingsDocument {
    fn eq(&self, other: &Self) -> bool {
        self.to_value() == other.to_value()
    }
}

impl SettingsDocument {
    /// Parse a settings document. Whitespace-only text is an empty document.
    pub fn parse(text: &str) -> Result<Self, SettingsFormatError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_str(text)
            .map_err(|e| SettingsFormatError::new(format!("invalid JSON: {e}")))?;
        let Value::Object(mut root) = value else {
            return Err(SettingsFormatError::new("top level is not an object"));
        };

        let events = match root.get(HOOKS_KEY) {
            None => Vec::new(),
            Some(Value::Object(hooks)) => hooks
                .iter()
                .map(|(event, entries)| parse_event(event, entries))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(SettingsFormatError::new("hooks is not an object")),
        };
        if let Some(hooks) = root.get_mut(HOOKS_KEY) {
            *hooks = Value::Null;
        }

        Ok(Self { root, events })
    }

    /// Event names in document order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.name.as_str())
    }

    /// Entries registered for an event, in order.
    pub fn entries(&self, event: &str) -> &[HookEntry] {
        self.events
            .iter()
            .find(|e| e.name == event)
            .map(|e| e.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn to_value(&self) -> Value {
        let mut root = self.root.clone();
        if !self.events.is_empty() || root.contains_key(HOOKS_KEY) {
            let hooks: Map<String, Value> = self
                .events
                .iter()
                .map(|event| {
                    let entries = event
                        .entries
                        .iter()
                        .map(|entry| Value::Object(entry.value.clone()))
                        .collect();
                    (event.name.clone(), Value::Array(entries))
                })
                .collect();
            // Replacing an existing key keeps its position.
            root.insert(HOOKS_KEY.to_string(), Value::Object(hooks));
        }
        Value::Object(root)
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_pretty_string(&self) -> String {
        let mut text =
            serde_json::to_string_pretty(&self.to_value()).unwrap_or_else(|_| "{}".to_string());
        text.push('\n');
        text
    }

    fn event_mut(&mut self, name: &str) -> &mut EventHooks {
        let position = match self.events.iter().position(|e| e.name == name) {
            Some(position) => position,
            None => {
                self.events.push(EventHooks {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                self.events.len() - 1
            }
        };
        &mut self.events[position]
    }
}

fn parse_event(event: &str, entries: &Value) -> Result<EventHooks, SettingsFormatError> {
    let Value::Array(entries) = entries else {
        return Err(SettingsFormatError::new(format!("hooks.{event} is not a list")));
    };
    let entries = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let at = format!("hooks.{event}[{i}]");
            match entry {
                Value::Object(map) => HookEntry::parse(map.clone(), &at),
                _ => Err(SettingsFormatError::new(format!("{at} is not an object"))),
            }
        })
        .collect::<Result<_, _>>()?;
    Ok(EventHooks {
        name: event.to_string(),
        entries,
    })
}

/// Register every desired hook exactly once.
///
/// A hook whose command is already registered for its event is left where
/// it is; only its timeout is brought up to date. Missing hooks are appended
/// to the end of their event's list. `changed` is false iff every desired
/// hook was already present with the same command and timeout.
pub fn merge(
    mut document: SettingsDocument,
    desired: &[HookDefinition],
) -> (SettingsDocument, bool) {
    let mut changed = false;

    for def in desired {
        let event = document.event_mut(&def.event);

        let found = event.entries.iter().enumerate().find_map(|(entry_idx, entry)| {
            entry
                .commands
                .iter()
                .position(|c| c.command == def.command)
                .map(|slot| (entry_idx, slot))
        });

        match found {
            Some((entry_idx, slot)) => {
                let entry = &mut event.entries[entry_idx];
                if let CommandSlot::Nested { timeout, .. } = entry.commands[slot].slot {
                    if timeout != Some(def.timeout_ms) {
                        entry.set_timeout(slot, def.timeout_ms);
                        changed = true;
                    }
                }
            }
            None => {
                event.entries.push(HookEntry::from_definition(def));
                changed = true;
            }
        }
    }

    (document, changed)
}

/// Load the settings file; a missing file is an empty document.
pub fn load_settings(path: &Path) -> Result<SettingsDocument, SettingsError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(SettingsDocument::parse(&text)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SettingsDocument::default()),
        Err(e) => Err(SettingsError::io(path, e)),
    }
}

/// Write the settings file via a temporary sibling renamed over the target.
pub fn save_settings(path: &Path, document: &SettingsDocument) -> Result<(), SettingsError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| SettingsError::io(parent, e))?;
    tmp.write_all(document.to_pretty_string().as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| SettingsError::io(tmp.path(), e))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())
            .map_err(|e| SettingsError::io(tmp.path(), e))?;
    }

    tmp.persist(path)
        .map_err(|e| SettingsError::io(path, e.error))?;
    Ok(())
}
