//! In-memory implementation of the Storage trait.
//!
//! Same semantics as the persistent media, with nothing written to disk.
//! Used directly in tests and as the shared medium of an in-process origin.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, StorageError};
use crate::traits::Storage;

/// In-memory storage.
///
/// All data is lost when the storage is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value under `key`, returning the previous value.
    pub fn replace(&self, key: &str, value: &str) -> Result<Option<String>> {
        let mut slots = self.slots.write().map_err(|_| StorageError::poisoned())?;
        Ok(slots.insert(key.to_string(), value.to_string()))
    }

    /// Delete the entry under `key`, returning the removed value.
    pub fn take(&self, key: &str) -> Result<Option<String>> {
        let mut slots = self.slots.write().map_err(|_| StorageError::poisoned())?;
        Ok(slots.remove(key))
    }

    /// Delete every entry, returning how many were removed.
    pub fn drain(&self) -> Result<usize> {
        let mut slots = self.slots.write().map_err(|_| StorageError::poisoned())?;
        let count = slots.len();
        slots.clear();
        Ok(count)
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.read().map_err(|_| StorageError::poisoned())?;
        Ok(slots.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.replace(key, value).map(|_| ())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.take(key).map(|_| ())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let slots = self.slots.read().map_err(|_| StorageError::poisoned())?;
        let mut keys: Vec<String> = slots.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn clear(&self) -> Result<()> {
        self.drain().map(|_| ())
    }

    fn len(&self) -> Result<usize> {
        let slots = self.slots.read().map_err(|_| StorageError::poisoned())?;
        Ok(slots.len())
    }
}
