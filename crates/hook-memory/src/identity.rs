//! Workspace, namespace and session identifiers.
//!
//! Every identifier here is a pure function of its inputs, except the
//! ephemeral session id which is random by construction. Hashes are SHA-256
//! over the UTF-8 bytes of the canonical workspace path, so results agree
//! across processes and platforms.

use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix of every session id this plugin creates.
pub const SESSION_PREFIX: &str = "augment";

/// Separator between the base namespace and the workspace id.
pub const NAMESPACE_SEPARATOR: char = ':';

// Hex characters kept from a digest for ids
const ID_HEX_LEN: usize = 16;
const VIEW_HASH_HEX_LEN: usize = 8;

/// A resolved project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: Utf8PathBuf,
    name: String,
    id: String,
}

impl Workspace {
    /// Resolve a workspace path to its canonical form.
    ///
    /// Existing paths are canonicalized (symlinks resolved). Paths that do
    /// not exist are made absolute against the current directory and
    /// normalized lexically.
    pub fn resolve(path: impl AsRef<str>) -> Result<Self> {
        let path = path.as_ref().trim();
        if path.is_empty() {
            return Err(MemoryError::config("workspace path is empty"));
        }

        let root = normalize(Utf8Path::new(path))?;
        let name = root
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "workspace".to_string());
        let id = short_hash(root.as_str(), ID_HEX_LEN);

        Ok(Self { root, name, id })
    }

    /// The primary workspace: first host-supplied root, else the current
    /// directory.
    pub fn from_roots(roots: &[String]) -> Result<Self> {
        match roots.first() {
            Some(root) => Self::resolve(root),
            None => {
                let cwd = current_dir()?;
                Self::resolve(cwd.as_str())
            }
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Final path component, e.g. `my-project`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with every character outside `[A-Za-z0-9_-]` replaced by `_`.
    pub fn safe_name(&self) -> String {
        sanitize(&self.name)
    }

    /// Stable id derived from the canonical path.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Summary view covering every session of this workspace.
    pub fn workspace_view_name(&self) -> String {
        format!("{SESSION_PREFIX}_workspace_{}", self.safe_name())
    }

    /// Summary view covering one session of this workspace.
    pub fn session_view_name(&self, session: &SessionId) -> String {
        format!(
            "{SESSION_PREFIX}_session_{}_{}",
            self.safe_name(),
            short_hash(session.as_str(), VIEW_HASH_HEX_LEN)
        )
    }
}

/// Partition key isolating one project's memories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceId(String);

impl NamespaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One continuous conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a hook needs to address the memory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub workspace: Option<Workspace>,
    pub namespace: NamespaceId,
    pub session: SessionId,
}

/// Namespace for a workspace under a base namespace.
///
/// With scoping disabled the base namespace is returned unchanged.
pub fn derive_namespace(
    base: &str,
    workspace: Option<&Workspace>,
    scoping: bool,
) -> Result<NamespaceId> {
    if !scoping {
        return Ok(NamespaceId(base.to_string()));
    }
    let workspace = workspace.ok_or_else(|| {
        MemoryError::config("workspace scoping is enabled but no workspace path is available")
    })?;
    Ok(NamespaceId(format!(
        "{base}{NAMESPACE_SEPARATOR}{}",
        workspace.id()
    )))
}

/// Session id for this invocation.
///
/// Precedence: a non-blank host token, then persistent derivation, then a
/// fresh random id.
pub fn derive_session(
    namespace: &NamespaceId,
    workspace: Option<&Workspace>,
    persistent: bool,
    host_token: Option<&str>,
) -> SessionId {
    if let Some(token) = host_token.map(str::trim).filter(|t| !t.is_empty()) {
        return SessionId(format!("{SESSION_PREFIX}:{token}"));
    }

    if persistent {
        return match workspace {
            Some(ws) => {
                let seed = format!("{}\n{}", namespace.as_str(), ws.id());
                SessionId(format!(
                    "{SESSION_PREFIX}:{}:{}",
                    ws.safe_name(),
                    short_hash(&seed, ID_HEX_LEN)
                ))
            }
            None => SessionId(format!(
                "{SESSION_PREFIX}:{}",
                short_hash(namespace.as_str(), ID_HEX_LEN)
            )),
        };
    }

    ephemeral_session()
}

/// Resolve workspace, namespace and session from configuration and host
/// input.
pub fn resolve_identity(
    config: &MemoryConfig,
    workspace_roots: &[String],
    host_token: Option<&str>,
) -> Result<Identity> {
    let workspace = match Workspace::from_roots(workspace_roots) {
        Ok(ws) => Some(ws),
        Err(e) if config.use_workspace_namespace => return Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "no workspace; using base namespace");
            None
        }
    };

    let namespace = derive_namespace(
        &config.namespace,
        workspace.as_ref(),
        config.use_workspace_namespace,
    )?;
    let session = derive_session(
        &namespace,
        workspace.as_ref(),
        config.use_persistent_session,
        host_token,
    );

    Ok(Identity {
        workspace,
        namespace,
        session,
    })
}

fn ephemeral_session() -> SessionId {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    SessionId(format!("{SESSION_PREFIX}-{stamp}-{}", &nonce[..8]))
}

fn short_hash(input: &str, hex_len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(hex_len);
    encoded
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| MemoryError::config(format!("cannot determine current directory: {e}")))?;
    Utf8PathBuf::try_from(cwd)
        .map_err(|e| MemoryError::config(format!("current directory is not UTF-8: {e}")))
}

fn normalize(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        current_dir()?.join(path)
    };

    match absolute.canonicalize_utf8() {
        Ok(canonical) => Ok(canonical),
        Err(_) => Ok(lexical_normalize(&absolute)),
    }
}

fn lexical_normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_str()),
        }
    }
    out
}
