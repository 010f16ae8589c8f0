//! # slotsync Core
//!
//! Pure primitives for slotsync: the on-disk envelope, the codecs that turn
//! values into slot strings, and the decoded states a slot can be in.
//!
//! This crate contains no I/O, no storage, no notification. It is pure
//! computation over slot contents.
//!
//! ## Key Types
//!
//! - [`Envelope`] - Tagged wrapper distinguishing a present value from an explicit clear
//! - [`Codec`] - Reversible, type-preserving encode/decode capability
//! - [`JsonCodec`] / [`CborCodec`] - The two shipped codecs
//! - [`SlotState`] - Absent, cleared, corrupt, or holding a value
//!
//! ## Wire Format
//!
//! An envelope is encoded with an explicit `type` discriminant:
//!
//! ```text
//! {"type":"value","value":5}
//! {"type":"cleared"}
//! ```
//!
//! A slot that was never written has no entry at all and is never encoded.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod state;

pub use codec::{CborCodec, Codec, JsonCodec};
pub use envelope::{detect_envelope, Envelope, EnvelopeKind};
pub use error::{CodecError, Result};
pub use state::SlotState;
