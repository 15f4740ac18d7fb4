//! Durable cart storage backed by a JSON object on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use saumara_core::{CartStorage, StorageError};

/// A `{key: value}` JSON file, rewritten whole on every write.
///
/// Unreadable or malformed files read as empty, matching how the cart treats
/// a corrupt stored value.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

impl CartStorage for JsonFileStorage {
    fn read(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load().remove(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load();
        values.insert(key.to_owned(), value.to_owned());

        let raw = serde_json::to_string_pretty(&values).map_err(|e| StorageError::Write(e.to_string()))?;
        // Write beside the target then rename, so a crash never leaves half a file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw).map_err(|e| StorageError::Write(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StorageError::Write(e.to_string()))
    }
}
