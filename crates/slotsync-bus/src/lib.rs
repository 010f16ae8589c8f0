//! # slotsync Bus
//!
//! Change notification for slotsync. Every reader of a key must observe
//! writes made by any writer, in its own execution context or in another
//! one sharing the same storage origin.
//!
//! ## Channels
//!
//! - **Same-context**: a synchronous in-process signal carrying the written
//!   key, fired right after every local write or clear ([`LocalBus`]).
//! - **Cross-context**: the storage medium's native change signal, delivered
//!   to every *other* context of the origin ([`MemoryOrigin`],
//!   [`SqliteWatcher`], and the browser `storage` event on wasm32).
//!
//! Native signals are never delivered to the writing context, which is why
//! the same-context channel exists. [`ChangeBus`] composes one of each behind
//! a single `subscribe(key, on_change)` contract.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use slotsync_bus::{ChangeBus, ListenerRegistry, LocalBus};
//!
//! let bus = ChangeBus::new(Arc::new(LocalBus::new()), Arc::new(ListenerRegistry::new()));
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&hits);
//! let subscription = bus.subscribe("theme", move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! bus.notify("theme");
//! bus.notify("other");
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//!
//! subscription.unsubscribe();
//! bus.notify("theme");
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

pub mod bus;
pub mod error;
pub mod event;
pub mod local;
pub mod registry;
pub mod transport;
#[cfg(not(target_arch = "wasm32"))]
pub mod watcher;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use bus::{ChangeBus, Subscription};
pub use error::{BusError, Result};
pub use event::{ChangeSignal, StorageEvent};
pub use local::LocalBus;
pub use registry::{Listener, ListenerId, ListenerRegistry};
pub use transport::memory::{ContextId, MemoryOrigin, OriginContext, OriginStorage};
pub use transport::{LocalChannel, Transport};
#[cfg(not(target_arch = "wasm32"))]
pub use watcher::{SqliteWatcher, WatchConfig, WatchHandle};
#[cfg(target_arch = "wasm32")]
pub use web::{StorageEventTransport, WindowLocalChannel, LOCAL_CHANGE_EVENT};
