//! Durable key/value storage backing the credential store.
//!
//! Each backend persists plain string entries. Absence of a key means "unset";
//! backends never store placeholder empty strings on their own.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the session store inside the data directory
const STORE_FILE: &str = "session.json";

/// Keychain service name used by [`KeyringStore`]
const KEYRING_SERVICE: &str = "storefront";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A durable string key/value store.
///
/// `get` and `set` are atomic single-key operations, so concurrent writers
/// resolve to last-write-wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    entries: BTreeMap<String, String>,
    updated_at: DateTime<Utc>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

/// JSON file store. Every write rewrites the whole document.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store rooted in `dir`, using the default file name
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORE_FILE))
    }

    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the store was last written, if it exists on disk
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_document()?.map(|doc| doc.updated_at))
    }

    fn read_document(&self) -> Result<Option<StoreDocument>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_document(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(doc)?;
        write_atomic(&self.path, contents.as_bytes())?;
        Ok(())
    }

    /// Read-modify-write under the lock. A corrupt document is replaced,
    /// so `clear` can always recover the store.
    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut doc = match self.read_document() {
            Ok(doc) => doc.unwrap_or_default(),
            Err(StoreError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt session file");
                StoreDocument::default()
            }
            Err(e) => return Err(e),
        };
        f(&mut doc.entries);
        doc.updated_at = Utc::now();
        self.write_document(&doc)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self
            .read_document()?
            .and_then(|mut doc| doc.entries.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
/// Readers see either the old file or the new one, never a partial write.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&temp_path, path)
}

/// OS keychain store. Each key becomes its own keychain entry.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key, "Keychain entry removed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{CredentialStore, SessionUpdate, StoredSession};

    #[test]
    fn test_memory_store_get_set_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));

        store.remove("a").unwrap();
        store.remove("a").unwrap(); // absent key is fine
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::in_dir(dir.path());
        assert_eq!(store.get("accessToken").unwrap(), None);
        assert!(store.updated_at().unwrap().is_none());

        store.set("accessToken", "A").unwrap();
        store.set("username", "alice").unwrap();

        let reopened = FileStore::in_dir(dir.path());
        assert_eq!(reopened.get("accessToken").unwrap().as_deref(), Some("A"));
        assert_eq!(reopened.get("username").unwrap().as_deref(), Some("alice"));
        assert!(reopened.updated_at().unwrap().is_some());

        reopened.remove("accessToken").unwrap();
        assert_eq!(store.get("accessToken").unwrap(), None);
        assert_eq!(store.get("username").unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn test_file_store_remove_without_file_does_not_create_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());

        store.remove("refreshToken").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.get("username"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_clear_recovers_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileStore::in_dir(dir.path()));
        std::fs::write(backend.path(), r#"{"entries": {"accessToken": "A""#).unwrap();

        let store = CredentialStore::new(backend.clone());
        assert!(store.snapshot().is_err());

        store.clear().unwrap();
        assert_eq!(store.snapshot().unwrap(), StoredSession::default());

        store.set(&SessionUpdate::access("fresh")).unwrap();
        let reopened = FileStore::in_dir(dir.path());
        assert_eq!(reopened.get("accessToken").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"entries\": {}}").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"entries\": {}}");
        assert!(!path.with_extension("tmp").exists());
    }
}
