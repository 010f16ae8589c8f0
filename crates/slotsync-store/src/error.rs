//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[cfg(not(target_arch = "wasm32"))]
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The storage medium does not exist in this environment.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The medium rejected an operation (quota, security policy, poisoned lock).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn poisoned() -> Self {
        StorageError::Backend("storage lock poisoned".into())
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
