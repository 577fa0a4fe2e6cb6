//! Persistent client-side key-value storage
//!
//! Clients keep their credentials in a small string-to-string store that
//! outlives the process, the same way a browser keeps them in local storage.
//! Reads and writes never fail from the caller's point of view: a store that
//! cannot be written logs a warning and keeps serving its in-memory view.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// String key-value storage shared by credential holders
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str);

    /// Remove `key`. Removing a missing key is a no-op.
    fn remove(&self, key: &str);
}

/// Volatile store, mostly useful in tests and short-lived tools
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }
}

/// Store persisted as a JSON object on disk
///
/// Every mutation is written through to the file. A missing file is an empty
/// store; an unreadable or corrupt one is treated as empty as well.
///
/// Writes are synchronous `std::fs` calls made on the calling thread, which
/// may be an async worker during a token refresh. Keep the file to a handful
/// of small entries; anything larger belongs behind `spawn_blocking`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading whatever it currently holds
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!("Opened storage at {} ({} entries)", path.display(), entries.len());

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    /// Default location for the store of application `app`
    pub fn default_path(app: &str) -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("storefront")
            .join(format!("{app}.json"))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        if let Err(e) = write_entries(&self.path, entries) {
            warn!("Failed to persist storage to {}: {}", self.path.display(), e);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write()
            && entries.remove(key).is_some()
        {
            self.persist(&entries);
        }
    }
}

fn load_entries(path: &Path) -> HashMap<String, String> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Failed to read storage at {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    serde_json::from_slice(&raw).unwrap_or_else(|e| {
        warn!("Ignoring corrupt storage at {}: {}", path.display(), e);
        HashMap::new()
    })
}

fn write_entries(path: &Path, entries: &HashMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(entries)?;

    // Write to a sibling file first so a crash never leaves half a JSON object
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}
