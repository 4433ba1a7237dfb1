//! Durable key-value store.
//!
//! Mirrors the browser's extension storage: string keys, JSON string
//! values. `FileStore` keeps every key in one JSON object file under the
//! config dir; `MemoryStore` is for tests and in-process hosts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Error type for store writes. Reads never fail: a missing or unreadable
/// value is simply absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Filesystem error
    Io(String),
    /// Value could not be serialized
    Serialize(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "Storage I/O error: {}", msg),
            StoreError::Serialize(msg) => write!(f, "Serialize error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Shared by the router and the popup; implementations use interior
/// mutability so one instance can sit behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ── In-memory ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

// ── File-backed ────────────────────────────────────────────────────

pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<config_dir>/swatchsheet/storage.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swatchsheet")
            .join("storage.json")
    }

    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                log::warn!("Ignoring unreadable store {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|e| StoreError::Io(e.to_string()))?;
        let mut entries = self.read_all();
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|e| StoreError::Io(e.to_string()))?;
        let mut entries = self.read_all();
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
