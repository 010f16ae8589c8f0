//! # slotsync
//!
//! A reactive, cross-context accessor for a single key of a shared
//! key-value store.
//!
//! ## Overview
//!
//! Each [`Binding`] owns one key of a string-valued medium and gives it:
//!
//! - **Typed values**: payloads go through a [`Codec`] inside an envelope
//!   that tells a present value apart from an explicit clear.
//! - **Migration**: slots written before envelopes existed are rewritten
//!   once, on attach, without losing their value.
//! - **Live sync**: writes and clears are announced to every binding of the
//!   key in this context, and the medium's native signal reaches bindings in
//!   other contexts.
//!
//! ## Read Contract
//!
//! | Slot | `read()` |
//! |---|---|
//! | absent | initial value |
//! | value | the value |
//! | cleared | `None`, even with an initial value |
//! | corrupt | initial value (logged) |
//!
//! ## Usage
//!
//! ```rust
//! use slotsync::Context;
//!
//! let context = Context::in_memory();
//! let counter = context.bind("counter", Some(0_i64));
//! assert_eq!(counter.read(), Some(0));
//!
//! counter.write(&5).unwrap();
//! assert_eq!(counter.read(), Some(5));
//!
//! counter.clear().unwrap();
//! assert_eq!(counter.read(), None);
//!
//! // The clear persists for new bindings too.
//! assert_eq!(context.bind("counter", Some(0_i64)).read(), None);
//! ```
//!
//! ## Re-exports
//!
//! The component crates are re-exported for convenience:
//!
//! - `slotsync::core` - Envelope, codecs, slot states
//! - `slotsync::store` - Storage trait and backends
//! - `slotsync::bus` - Change signals and transports

pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod live;
pub mod migrate;
pub mod snapshot;

// Re-export component crates
pub use slotsync_bus as bus;
pub use slotsync_core as core;
pub use slotsync_store as store;

// Re-export main types for convenience
pub use binding::Binding;
pub use config::BindingConfig;
pub use context::Context;
pub use error::{Result, SlotError};
pub use live::LiveValue;
pub use migrate::{migrate, MigrationOutcome};
pub use snapshot::SnapshotStore;

// Re-export commonly used component types
pub use slotsync_bus::{ChangeBus, MemoryOrigin, Subscription};
pub use slotsync_core::{CborCodec, Codec, Envelope, EnvelopeKind, JsonCodec, SlotState};
pub use slotsync_store::{MemoryStorage, Storage};

#[cfg(not(target_arch = "wasm32"))]
pub use slotsync_bus::{SqliteWatcher, WatchConfig, WatchHandle};
#[cfg(not(target_arch = "wasm32"))]
pub use slotsync_store::SqliteStorage;
#[cfg(target_arch = "wasm32")]
pub use slotsync_store::LocalStorage;
