//! Persisted login credential and the auth header provider.
//!
//! The credential is a `{username, token}` pair stored as serialized JSON
//! under a single key ([`STORAGE_KEY`]). It is written by login, cleared by
//! logout, and read by the HTTP client before every request.
//!
//! Storage goes through the [`CredentialStore`] trait so tests (and embedders)
//! can swap the on-disk [`FileCredentialStore`] for a
//! [`MemoryCredentialStore`].
//!
//! # File format
//!
//! [`FileCredentialStore`] keeps a small key/value JSON document, the same
//! shape browser local storage has: keys map to string values, and the
//! credential value is itself a JSON string.
//!
//! ```json
//! { "activeTigger": "{\"username\":\"ada\",\"token\":\"eyJ...\"}" }
//! ```

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::ApiError;

/// Storage key holding the serialized credential.
pub const STORAGE_KEY: &str = "activeTigger";

/// Header carrying the user name next to the bearer token.
pub const USERNAME_HEADER: &str = "username";

/// Bearer token and the user it was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub token: String,
}

/// Read/write access to the persisted credential.
///
/// `get` never fails: an unreadable store is reported as "no credential" so
/// requests proceed unauthenticated and the server rejects them.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: &Credential) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

/// Derives request headers from the stored credential.
///
/// Returns `None` when no credential is stored. Otherwise returns
/// `Authorization: Bearer <token>` and `username: <username>`. Values that
/// cannot be encoded as header values are skipped.
pub fn auth_headers(store: &dyn CredentialStore) -> Option<HeaderMap> {
    let credential = store.get()?;
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", credential.token)) {
        headers.insert(AUTHORIZATION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&credential.username) {
        headers.insert(HeaderName::from_static(USERNAME_HEADER), value);
    }

    Some(headers)
}

// ============ In-memory store ============

/// Credential store backed by process memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.slot.lock().ok()?.clone()
    }

    fn set(&self, credential: &Credential) -> Result<(), ApiError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ApiError::Storage("credential lock poisoned".to_string()))?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ApiError::Storage("credential lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

// ============ File store ============

/// Credential store persisted in a key/value JSON file.
///
/// Other keys present in the file are preserved on write. A file that cannot
/// be parsed is never overwritten: `set` and `clear` fail with
/// [`ApiError::Storage`] and leave it as is.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, ApiError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ApiError::Storage(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ApiError::Storage(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ApiError::Storage(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| {
            ApiError::Storage(format!("failed to write {}: {}", self.path.display(), e))
        })?;
        restrict_permissions(&self.path)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        let entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable credential store");
                return None;
            }
        };
        let raw = entries.get(STORAGE_KEY)?;
        match serde_json::from_str(raw) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(error = %e, key = STORAGE_KEY, "ignoring malformed credential");
                None
            }
        }
    }

    fn set(&self, credential: &Credential) -> Result<(), ApiError> {
        let mut entries = self.read_entries()?;
        let raw = serde_json::to_string(credential).map_err(|e| ApiError::Storage(e.to_string()))?;
        entries.insert(STORAGE_KEY.to_string(), raw);
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), ApiError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut entries = self.read_entries()?;
        entries.remove(STORAGE_KEY);
        self.write_entries(&entries)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ApiError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| ApiError::Storage(format!("failed to chmod {}: {}", path.display(), e)))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ApiError> {
    Ok(())
}
