//! The slot envelope.
//!
//! Every slot written by slotsync holds an encoded [`Envelope`]. The
//! envelope separates "holds a value" from "explicitly cleared"; a slot that
//! was never written has no entry and is never encoded.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::codec::Codec;

/// Tagged wrapper stored in a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope<T> {
    /// A present value.
    Value {
        /// The wrapped payload.
        value: T,
    },
    /// Explicit "no value" marker.
    Cleared,
}

impl<T> Envelope<T> {
    /// Wrap a value.
    pub fn value(value: T) -> Self {
        Envelope::Value { value }
    }

    /// The discriminant of this envelope.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::Value { .. } => EnvelopeKind::Value,
            Envelope::Cleared => EnvelopeKind::Cleared,
        }
    }

    /// Unwrap into the payload, `None` for a cleared envelope.
    pub fn into_value(self) -> Option<T> {
        match self {
            Envelope::Value { value } => Some(value),
            Envelope::Cleared => None,
        }
    }
}

/// Discriminant of an [`Envelope`], independent of the payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Value,
    Cleared,
}

/// Check whether a raw slot string is a well-formed envelope.
///
/// The content must decode under `codec` and carry a `type` discriminant of
/// exactly `"value"` (with a `value` field) or `"cleared"`. The payload is
/// skipped, so this works without knowing the payload type. Anything else is
/// legacy or corrupt content and yields `None`.
pub fn detect_envelope<C: Codec>(codec: &C, raw: &str) -> Option<EnvelopeKind> {
    codec
        .decode::<Envelope<IgnoredAny>>(raw)
        .ok()
        .map(|envelope| envelope.kind())
}
