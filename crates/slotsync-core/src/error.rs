//! Error types for slotsync core.

use thiserror::Error;

/// Errors produced by a [`Codec`](crate::Codec).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value could not be turned into a slot string.
    #[error("encoding error: {0}")]
    Encode(String),

    /// The slot string is malformed or in a foreign format.
    #[error("decoding error: {0}")]
    Decode(String),
}

impl CodecError {
    /// Whether this is a decode failure (corrupt or foreign slot content).
    pub fn is_decode(&self) -> bool {
        matches!(self, CodecError::Decode(_))
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
