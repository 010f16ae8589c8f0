//! Storage trait: the abstract interface over a key-value medium.
//!
//! This trait lets bindings stay medium-agnostic. Implementations include
//! SQLite (persistent), in-memory (tests), and `localStorage` (browser).

use std::sync::Arc;

use crate::error::Result;

/// A string-keyed, string-valued, synchronous key-value medium.
///
/// Mirrors the browser `Storage` interface. All operations are local and
/// synchronous; writes replace the whole value under a key.
pub trait Storage: Send + Sync {
    /// Get the raw value under `key`, `None` when the key has no entry.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the entry under `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys that currently have an entry.
    fn keys(&self) -> Result<Vec<String>>;

    /// Delete every entry.
    fn clear(&self) -> Result<()>;

    /// Number of entries.
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}
