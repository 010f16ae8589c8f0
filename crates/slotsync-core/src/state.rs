//! Decoded slot states.

use serde::de::DeserializeOwned;

use crate::codec::Codec;
use crate::envelope::Envelope;

/// What a raw slot holds once decoded for a payload type `T`.
///
/// Keeps the four cases apart so callers can log or count them, even though
/// [`SlotState::resolve`] collapses corrupt slots into the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState<T> {
    /// No entry under the key (or an empty string).
    Absent,
    /// An explicit clear marker.
    Cleared,
    /// A present value.
    Value(T),
    /// Content that is not an envelope of `T` under the codec.
    Corrupt {
        /// Decoder message.
        reason: String,
    },
}

impl<T: DeserializeOwned> SlotState<T> {
    /// Decode a raw slot.
    pub fn from_raw<C: Codec>(codec: &C, raw: Option<&str>) -> Self {
        let raw = match raw {
            None => return SlotState::Absent,
            Some(raw) if raw.is_empty() => return SlotState::Absent,
            Some(raw) => raw,
        };

        match codec.decode::<Envelope<T>>(raw) {
            Ok(Envelope::Value { value }) => SlotState::Value(value),
            Ok(Envelope::Cleared) => SlotState::Cleared,
            Err(e) => SlotState::Corrupt {
                reason: e.to_string(),
            },
        }
    }
}

impl<T> SlotState<T> {
    /// Collapse into the public read contract.
    ///
    /// Absent and corrupt slots yield `initial`; a cleared slot yields
    /// `None` even when `initial` is set.
    pub fn resolve(self, initial: Option<T>) -> Option<T> {
        match self {
            SlotState::Value(value) => Some(value),
            SlotState::Cleared => None,
            SlotState::Absent | SlotState::Corrupt { .. } => initial,
        }
    }

    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            SlotState::Absent => "absent",
            SlotState::Cleared => "cleared",
            SlotState::Value(_) => "value",
            SlotState::Corrupt { .. } => "corrupt",
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, SlotState::Corrupt { .. })
    }
}
