//! Error types for the bus module.

use thiserror::Error;

/// Errors that can occur while running a change transport.
#[derive(Debug, Error)]
pub enum BusError {
    /// The underlying medium failed while reading changes.
    #[error("storage error: {0}")]
    Storage(#[from] slotsync_store::StorageError),

    /// No async runtime to run a background watcher on.
    #[error("no async runtime: {0}")]
    NoRuntime(String),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
