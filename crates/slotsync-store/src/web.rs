//! Browser `localStorage` medium (wasm32 only).
//!
//! The handle holds no JS objects; every call looks up `window.localStorage`
//! again, so the type stays `Send + Sync` on the single-threaded wasm target.

use wasm_bindgen::JsValue;

use crate::error::{Result, StorageError};
use crate::traits::Storage;

/// `window.localStorage` of the current browsing context.
#[derive(Debug, Clone, Copy)]
pub struct LocalStorage {
    _private: (),
}

impl LocalStorage {
    /// Bind to `window.localStorage`.
    ///
    /// Fails with [`StorageError::Unavailable`] outside a window or when the
    /// browser denies storage access.
    pub fn open() -> Result<Self> {
        let handle = Self { _private: () };
        handle.storage()?;
        Ok(handle)
    }

    fn storage(&self) -> Result<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(describe(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".into()))
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

impl Storage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }

    fn keys(&self) -> Result<Vec<String>> {
        let storage = self.storage()?;
        let len = storage
            .length()
            .map_err(|e| StorageError::Backend(describe(&e)))?;
        let mut keys = Vec::with_capacity(len as usize);
        for index in 0..len {
            if let Some(key) = storage
                .key(index)
                .map_err(|e| StorageError::Backend(describe(&e)))?
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear(&self) -> Result<()> {
        self.storage()?
            .clear()
            .map_err(|e| StorageError::Backend(describe(&e)))
    }

    fn len(&self) -> Result<usize> {
        self.storage()?
            .length()
            .map(|len| len as usize)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }
}
