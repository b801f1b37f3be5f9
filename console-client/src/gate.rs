//! Session gate
//!
//! Holds the opaque bearer token. Its presence is the only authorization
//! signal the console consults; the token is never validated client-side.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ClientResult;

/// Fixed key the token is persisted under
pub const TOKEN_KEY: &str = "token";

/// Opaque session credential
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for SessionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

// ============================================================================
// Token Store
// ============================================================================

/// Durable key-value store for the session token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> ClientResult<Option<String>>;
    fn save(&self, token: &str) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// In-memory token store (nothing survives the process)
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self.token.read().clone())
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.token.write() = None;
        Ok(())
    }
}

/// JSON file token store
///
/// The file holds a flat JSON object; the token lives under [`TOKEN_KEY`]
/// and any other keys are left untouched.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> ClientResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn write_map(&self, map: &Map<String, Value>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        let map = self.read_map()?;
        Ok(map
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        let mut map = self.read_map()?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(&map)
    }

    fn clear(&self) -> ClientResult<()> {
        let mut map = self.read_map()?;
        if map.remove(TOKEN_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// ============================================================================
// Session Gate
// ============================================================================

/// Authorization gate in front of the collection store
pub struct SessionGate {
    token: RwLock<Option<SessionToken>>,
    store: Box<dyn TokenStore>,
}

impl SessionGate {
    /// Closed gate backed by `store`; any persisted token is ignored
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            token: RwLock::new(None),
            store: Box::new(store),
        }
    }

    /// Closed gate with an in-memory store
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::default())
    }

    /// Gate opened with whatever token `store` already holds
    ///
    /// An unreadable store leaves the gate closed.
    pub fn restore(store: impl TokenStore + 'static) -> Self {
        let token = match store.load() {
            Ok(token) => token.map(SessionToken::from),
            Err(e) => {
                tracing::warn!("Failed to load persisted session token: {e}");
                None
            }
        };
        if token.is_some() {
            tracing::debug!("Restored persisted session token");
        }
        Self {
            token: RwLock::new(token),
            store: Box::new(store),
        }
    }

    /// True iff a token is present
    pub fn is_authorized(&self) -> bool {
        self.token.read().is_some()
    }

    /// Current token
    pub fn token(&self) -> Option<SessionToken> {
        self.token.read().clone()
    }

    /// Store the token (called by the login collaborator)
    ///
    /// A persistence failure is logged; the in-memory session stays admitted.
    pub fn admit(&self, token: impl Into<SessionToken>) {
        let token = token.into();
        if let Err(e) = self.store.save(token.as_str()) {
            tracing::warn!("Failed to persist session token: {e}");
        }
        *self.token.write() = Some(token);
        tracing::info!("Session admitted");
    }

    /// Clear the token
    pub fn revoke(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear persisted session token: {e}");
        }
        *self.token.write() = None;
        tracing::info!("Session revoked");
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("authorized", &self.is_authorized())
            .finish()
    }
}
