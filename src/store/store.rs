use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Errors raised by a durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store contents are not valid JSON ({context}): {source}")]
    Corrupt {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("key '{0}' is unavailable")]
    Unavailable(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Whole-value key/value store holding every piece of durable state.
///
/// There is no transactional update: callers read a value, change it in
/// memory, and write it back. Serializing those cycles is the job of the
/// background service, which is the only writer.
pub trait Store: Send {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, Value>,
    unreadable: BTreeSet<String>,
    fail_writes: bool,
}

/// Store kept in memory. Clones share the same contents, so a test can keep
/// one clone for inspection while the background service owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make reads of `key` fail until `restore_key` is called.
    pub fn make_unreadable(&self, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unreadable.insert(key.to_string());
        }
    }

    pub fn restore_key(&self, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unreadable.remove(key);
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_writes = fail;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.lock()?;
        if inner.unreadable.contains(key) {
            return Err(StoreError::Unavailable(key.to_string()));
        }
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.fail_writes {
            return Err(StoreError::Unavailable(key.to_string()));
        }
        inner.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.fail_writes {
            return Err(StoreError::Unavailable(key.to_string()));
        }
        inner.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.entries.keys().cloned().collect())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Store persisted as a single JSON object on disk.
///
/// Every operation re-reads the file and every mutation rewrites it in full.
/// A missing file is an empty store; a file that does not parse is an error.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            context: self.path.display().to_string(),
            source: e,
        })
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| StoreError::Corrupt {
            context: "serializing store".into(),
            source: e,
        })?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }

        std::fs::write(&self.path, json).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load()?.into_keys().collect())
    }
}
