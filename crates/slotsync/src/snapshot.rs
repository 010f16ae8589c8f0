//! The snapshot-store consumer contract.
//!
//! A reactive layer (a UI framework's external-store hook, a cache, a
//! logger) needs exactly three operations from a key binding. This trait is
//! that surface, object-safe so the layer can hold `&dyn SnapshotStore`
//! without knowing payload, medium or codec types.

use slotsync_bus::Subscription;

/// A subscribable source of raw slot snapshots.
///
/// The consumer decodes snapshots itself and must fall back to its default
/// when decoding fails.
pub trait SnapshotStore {
    /// Current raw slot content. Synchronous and side-effect free.
    fn get_snapshot(&self) -> Option<String>;

    /// Snapshot for environments with no storage medium (pre-rendering).
    /// Always a neutral `None`.
    fn get_server_snapshot(&self) -> Option<String> {
        None
    }

    /// Call `on_change` whenever the snapshot may have changed.
    fn subscribe(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Subscription;
}
