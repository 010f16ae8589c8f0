//! Codecs: reversible mappings between values and slot strings.
//!
//! The storage medium is string-valued, so every codec produces a `String`.
//! Type identity is carried by the Rust type the caller decodes into; the
//! codec only has to round-trip whatever serde hands it.
//!
//! Each codec also names a generic `Document` type. Migration decodes legacy
//! slots into a document when it cannot know the caller's type.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, Result};

/// Reversible encode/decode capability.
///
/// Implementations must round-trip: `decode(encode(v)) == v` for every
/// representable `v`. Decoding malformed input fails with
/// [`CodecError::Decode`].
pub trait Codec: Clone + Send + Sync + 'static {
    /// Untyped document form of this codec's wire format.
    type Document: Serialize + DeserializeOwned + fmt::Debug + Send;

    /// Short codec name, used in log fields.
    fn name(&self) -> &'static str;

    /// Encode a value into a slot string.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String>;

    /// Decode a slot string into a value.
    fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T>;
}

/// JSON codec. Slot strings are JSON text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    type Document = serde_json::Value;

    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T> {
        serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// CBOR codec. Slot strings are lowercase hex of the CBOR bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CborCodec;

impl Codec for CborCodec {
    type Document = ciborium::Value;

    fn name(&self) -> &'static str {
        "cbor"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(hex::encode(buf))
    }

    fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T> {
        let bytes = hex::decode(raw).map_err(|e| CodecError::Decode(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CodecError::Decode("empty CBOR input".into()));
        }
        let mut rest = &bytes[..];
        let value = ciborium::from_reader(&mut rest).map_err(|e| CodecError::Decode(e.to_string()))?;
        if !rest.is_empty() {
            return Err(CodecError::Decode(format!(
                "{} trailing bytes after CBOR item",
                rest.len()
            )));
        }
        Ok(value)
    }
}
