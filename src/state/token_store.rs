//! Access-credential storage.
//!
//! DESIGN
//! ======
//! [`TokenStore`] is the single holder of the current access credential.
//! It caches the value in memory so a `set` is always visible to the next
//! `get`, and writes through to a [`KeyValueStore`] backend so the
//! credential survives restarts. The backend is a trait so the CLI can use
//! a file while tests and embedders use memory.
//!
//! ERROR HANDLING
//! ==============
//! Backend failures are logged and swallowed by `TokenStore`: a credential
//! that fails to persist still works for the rest of the process, and an
//! unreadable store loads as "no credential".

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Key under which the access credential is persisted.
pub const ACCESS_KEY: &str = "access";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent string key-value backend.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Backend read failure.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// # Errors
    /// Backend write failure.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    ///
    /// # Errors
    /// Backend write failure.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY BACKEND
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE BACKEND
// =============================================================================

/// JSON object file on disk, e.g. `{"access": "..."}`.
///
/// A missing file is an empty store. Writes create parent directories and
/// restrict the file to the owner on Unix.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// TOKEN STORE
// =============================================================================

/// Holder of the current access credential. Clones share state.
#[derive(Clone)]
pub struct TokenStore {
    current: Arc<RwLock<Option<String>>>,
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Load the persisted credential (if any) from `backend`.
    #[must_use]
    pub fn load(backend: impl KeyValueStore + 'static) -> Self {
        let current = match backend.get(ACCESS_KEY) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "token store unreadable; starting without a credential");
                None
            }
        };
        Self { current: Arc::new(RwLock::new(current)), backend: Arc::new(backend) }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::load(MemoryStore::new())
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::load(FileStore::new(path))
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.current.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Replace the current credential.
    pub fn set(&self, access: &str) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(access.to_owned());
        if let Err(e) = self.backend.set(ACCESS_KEY, access) {
            tracing::warn!(error = %e, "failed to persist access credential");
        }
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Err(e) = self.backend.remove(ACCESS_KEY) {
            tracing::warn!(error = %e, "failed to remove persisted access credential");
        }
    }
}

#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;
