//! Durable key/value slot for the bearer token and the cached identity.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use storegate_auth::Identity;

/// Key holding the raw bearer token.
pub const TOKEN_KEY: &str = "token";
/// Key holding the JSON-serialized [`Identity`].
pub const USER_KEY: &str = "user";

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("failed to access token store at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode token store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence collaborator for the session (browser-storage equivalent).
///
/// Reads never fail: an unreadable slot is an absent one.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError>;
    fn remove(&self, key: &str) -> Result<(), TokenStoreError>;
}

impl<S> TokenStore for Arc<S>
where
    S: TokenStore + ?Sized,
{
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        (**self).remove(key)
    }
}

/// The stored bearer token, if any (blank counts as absent).
pub fn load_token(store: &dyn TokenStore) -> Option<String> {
    store
        .get(TOKEN_KEY)
        .filter(|token| !token.trim().is_empty())
}

/// The cached identity, if present and decodable.
pub fn load_identity(store: &dyn TokenStore) -> Option<Identity> {
    let raw = store.get(USER_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring undecodable cached identity");
            None
        }
    }
}

pub fn save_session(
    store: &dyn TokenStore,
    token: &str,
    identity: &Identity,
) -> Result<(), TokenStoreError> {
    store.set(TOKEN_KEY, token)?;
    save_identity(store, identity)
}

pub fn save_identity(store: &dyn TokenStore, identity: &Identity) -> Result<(), TokenStoreError> {
    let encoded = serde_json::to_string(identity)?;
    store.set(USER_KEY, &encoded)
}

/// Drop both durable keys. Failures are logged, never returned: a sign-out
/// must complete even when storage is broken.
pub fn clear_session(store: &dyn TokenStore) {
    for key in [TOKEN_KEY, USER_KEY] {
        if let Err(e) = store.remove(key) {
            tracing::warn!(key, error = %e, "failed to clear durable session key");
        }
    }
}

/// In-memory store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<BTreeMap<String, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.write().insert(TOKEN_KEY.to_string(), token.into());
        store
    }

    // A panicked writer leaves the map itself intact; keep serving it.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        self.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        self.write().remove(key);
        Ok(())
    }
}

/// JSON-file store: one object of string keys, rewritten on every change.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: RwLock<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, TokenStoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(TokenStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), TokenStoreError> {
        let io_err = |source| TokenStoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let encoded = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, encoded).map_err(io_err)
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), TokenStoreError> {
        let _guard = self.lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        match self.read_map() {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "token store unreadable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), TokenStoreError> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storegate_auth::Role;
    use storegate_core::UserId;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("storegate-{}-{}", std::process::id(), UserId::new()))
            .join(name)
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let store = InMemoryTokenStore::with_token("   ");
        assert_eq!(load_token(&store), None);
    }

    #[test]
    fn save_and_clear_session() {
        let store = InMemoryTokenStore::new();
        let identity = Identity::new(UserId::new(), "a@example.com", "A", [Role::Customer]);

        save_session(&store, "tok", &identity).unwrap();
        assert_eq!(load_token(&store).as_deref(), Some("tok"));
        assert_eq!(load_identity(&store), Some(identity));

        clear_session(&store);
        assert_eq!(store.get(TOKEN_KEY), None);
        assert_eq!(store.get(USER_KEY), None);
    }

    #[test]
    fn undecodable_identity_is_absent() {
        let store = InMemoryTokenStore::new();
        store.set(USER_KEY, "{not json").unwrap();
        assert_eq!(load_identity(&store), None);
    }

    #[test]
    fn in_memory_store_keeps_working_after_a_panicked_writer() {
        let store = Arc::new(InMemoryTokenStore::with_token("before"));

        let poisoner = store.clone();
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(store.inner.is_poisoned());

        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("before"));
        store.set(TOKEN_KEY, "after").unwrap();
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("after"));
        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_path("session.json");

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get(TOKEN_KEY), None);
        store.set(TOKEN_KEY, "abc").unwrap();
        store.set(USER_KEY, "{}").unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).as_deref(), Some("abc"));

        reopened.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY), None);
        assert_eq!(store.get(USER_KEY).as_deref(), Some("{}"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_reads_as_empty_but_refuses_writes() {
        let path = temp_path("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[").unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get(TOKEN_KEY), None);
        assert!(matches!(store.set(TOKEN_KEY, "x"), Err(TokenStoreError::Encode(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
