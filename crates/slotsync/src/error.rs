//! Error types for bindings and contexts.

use slotsync_bus::BusError;
use slotsync_core::CodecError;
use slotsync_store::StorageError;
use thiserror::Error;

/// Errors surfaced by writes, clears and context setup.
///
/// Reads never fail: absent, cleared and corrupt slots all resolve to a
/// value (see [`Binding::read`](crate::Binding::read)).
#[derive(Debug, Error)]
pub enum SlotError {
    /// The payload could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The storage medium rejected the operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A change channel could not be set up.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

/// Result type for slotsync operations.
pub type Result<T> = std::result::Result<T, SlotError>;
