//! Legacy slot migration.
//!
//! Slots written before envelopes existed hold a bare encoded value (or any
//! string at all). Migration rewrites such a slot into an envelope once,
//! when a binding attaches, keeping the logical value:
//!
//! 1. Absent or empty slot: nothing to do.
//! 2. Content that is already an envelope (a recognized tag): nothing to do.
//! 3. Content the codec can decode: wrap the decoded document.
//! 4. Anything else: wrap the raw string verbatim.
//!
//! Migration never fails past its boundary. Medium errors are logged and
//! reported as [`MigrationOutcome::Failed`]; the slot is left as it was.

use slotsync_core::{detect_envelope, Codec, Envelope, EnvelopeKind};
use slotsync_store::Storage;

/// What [`migrate`] did to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Migration was not attempted.
    Skipped,
    /// No entry under the key (or an empty string).
    Absent,
    /// The slot already holds an envelope.
    AlreadyEnveloped(EnvelopeKind),
    /// Legacy content decoded by the codec and wrapped.
    WrappedDocument,
    /// Legacy content the codec could not decode, wrapped as a string.
    WrappedVerbatim,
    /// Reading or rewriting the slot failed; it was left untouched.
    Failed { reason: String },
}

impl MigrationOutcome {
    /// Whether the slot was rewritten.
    pub fn rewrote(&self) -> bool {
        matches!(
            self,
            MigrationOutcome::WrappedDocument | MigrationOutcome::WrappedVerbatim
        )
    }
}

/// Bring the slot under `key` into envelope form.
///
/// Idempotent: a second call on the result finds an envelope and writes
/// nothing.
pub fn migrate<S, C>(storage: &S, codec: &C, key: &str) -> MigrationOutcome
where
    S: Storage + ?Sized,
    C: Codec,
{
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return MigrationOutcome::Absent,
        Err(e) => {
            tracing::warn!(key, error = %e, "migration could not read slot");
            return MigrationOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    if let Some(kind) = detect_envelope(codec, &raw) {
        return MigrationOutcome::AlreadyEnveloped(kind);
    }

    let (wrapped, outcome) = match codec.decode::<C::Document>(&raw) {
        Ok(document) => (
            codec.encode(&Envelope::value(&document)),
            MigrationOutcome::WrappedDocument,
        ),
        Err(_) => (
            codec.encode(&Envelope::value(raw.as_str())),
            MigrationOutcome::WrappedVerbatim,
        ),
    };

    let result = wrapped
        .map_err(|e| e.to_string())
        .and_then(|wrapped| storage.set_item(key, &wrapped).map_err(|e| e.to_string()));

    match result {
        Ok(()) => {
            tracing::debug!(key, codec = codec.name(), outcome = ?outcome, "migrated legacy slot");
            outcome
        }
        Err(reason) => {
            tracing::warn!(key, codec = codec.name(), error = %reason, "migration write failed");
            MigrationOutcome::Failed { reason }
        }
    }
}
