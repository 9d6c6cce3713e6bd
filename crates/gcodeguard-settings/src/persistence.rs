//! Key-value persistence
//!
//! The safety engine persists two opaque JSON blobs: the configuration (with
//! the stock model) and the learning database. Storage itself is a
//! collaborator behind [`KeyValueStore`]; this module ships an in-memory store
//! and a directory of JSON files.

use crate::error::{SettingsError, SettingsResult};
use gcodeguard_core::StoreError;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Blob key for configuration and stock model
pub const CONFIG_KEY: &str = "gcodeguard.config";

/// Blob key for the learning database
pub const LEARNING_KEY: &str = "gcodeguard.learning";

/// Named blob storage
pub trait KeyValueStore: Send + Sync {
    /// Read a blob, `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a blob, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Shared store handle
pub type StoreHandle = Arc<dyn KeyValueStore>;

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.blobs.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store writing one `<key>.json` file per key into a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the per-user data directory (`<data_dir>/gcodeguard`)
    pub fn in_data_dir() -> SettingsResult<Self> {
        let base = dirs::data_dir().ok_or_else(|| {
            SettingsError::DataDirectory("could not determine user data directory".to_string())
        })?;
        Ok(Self::new(base.join("gcodeguard")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_err = |e: std::io::Error| StoreError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        };
        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        std::fs::write(self.path_for(key), value).map_err(write_err)
    }
}

/// Read and decode a JSON blob
///
/// A missing key is `Ok(None)`; a blob that does not decode is
/// [`StoreError::Corrupt`].
pub fn load_blob<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(text) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Encode and write a JSON blob
pub fn save_blob<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let text = serde_json::to_string(value).map_err(|e| StoreError::Write {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, &text)
}
