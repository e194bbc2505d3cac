use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Durable string key/value storage, shaped like browser `localStorage`.
pub trait StateStorage: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns an error if the value cannot be stored.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
    unavailable: bool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Storage that fails every read and write, like a disabled `localStorage`.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_item(self, key: &str, value: &str) -> Self {
        self.lock().insert(key.to_string(), value.to_string());
        self
    }

    /// Successful `set_item` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StateStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        Ok(self.item(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        let needed = key.len() + value.len();
        if let Some(limit) = self.quota.filter(|limit| needed > *limit) {
            return Err(StorageError::QuotaExceeded { needed, limit });
        }
        self.lock().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl StateStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Reads the snapshot under `key`, merged field by field over `fallback`.
///
/// A missing key, a read failure, malformed JSON, or a non-object value all
/// yield `fallback`. Stored fields that do not deserialize are dropped and
/// the fallback value is kept for them.
pub fn read_snapshot<T, S>(storage: &S, key: &str, fallback: &T) -> T
where
    T: Serialize + DeserializeOwned + Clone,
    S: StateStorage + ?Sized,
{
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => return fallback.clone(),
        Err(e) => {
            debug!(key, error = %e, "storage read failed, using fallback");
            return fallback.clone();
        }
    };

    let stored = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(stored)) => stored,
        Ok(_) => {
            warn!(key, "stored snapshot is not a JSON object, ignoring");
            return fallback.clone();
        }
        Err(e) => {
            warn!(key, error = %e, "stored snapshot is corrupt, ignoring");
            return fallback.clone();
        }
    };

    let Ok(Value::Object(base)) = serde_json::to_value(fallback) else {
        return fallback.clone();
    };
    merge_fields(base, stored).unwrap_or_else(|| fallback.clone())
}

fn merge_fields<T: DeserializeOwned>(
    mut base: Map<String, Value>,
    stored: Map<String, Value>,
) -> Option<T> {
    for (field, value) in stored {
        if !base.contains_key(&field) {
            continue;
        }
        let previous = base.insert(field.clone(), value);
        if serde_json::from_value::<T>(Value::Object(base.clone())).is_err() {
            debug!(field = %field, "dropping unreadable stored field");
            if let Some(previous) = previous {
                base.insert(field, previous);
            }
        }
    }
    serde_json::from_value(Value::Object(base)).ok()
}

/// Writes `value` as JSON under `key`. Failures are logged and dropped.
pub fn write_snapshot<T, S>(storage: &S, key: &str, value: &T)
where
    T: Serialize,
    S: StateStorage + ?Sized,
{
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(key, error = %e, "state could not be serialized for storage");
            return;
        }
    };
    if let Err(e) = storage.set_item(key, &json) {
        debug!(key, error = %e, "storage write dropped");
    }
}
