//! Execution contexts.
//!
//! A context is one reader/writer of a shared medium: a browser tab, a
//! process attached to a SQLite file, or an in-process participant of a
//! [`MemoryOrigin`]. It owns the same-context channel that its bindings
//! announce on, and the cross-context transport that tells it about writes
//! made elsewhere.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use slotsync_bus::{ChangeBus, ListenerRegistry, LocalBus, MemoryOrigin, OriginStorage, Transport};
use slotsync_core::{Codec, JsonCodec};
use slotsync_store::{MemoryStorage, Storage};

use crate::binding::Binding;
use crate::config::BindingConfig;

/// Storage, change bus and codec shared by the bindings of one context.
pub struct Context<S: ?Sized, C = JsonCodec> {
    storage: Arc<S>,
    bus: ChangeBus,
    codec: C,
    config: BindingConfig,
}

impl<S: Storage + 'static> Context<S> {
    /// A context over `storage`, told about foreign writes by `remote`.
    pub fn new(storage: S, remote: Arc<dyn Transport>) -> Self {
        Self::from_shared(Arc::new(storage), remote)
    }

    /// A context with no other context to hear from.
    pub fn standalone(storage: S) -> Self {
        Self::new(storage, Arc::new(ListenerRegistry::new()))
    }
}

impl<S: Storage + ?Sized> Context<S> {
    /// Like [`new`](Self::new), for storage already shared with something
    /// else (usually the transport watching it).
    pub fn from_shared(storage: Arc<S>, remote: Arc<dyn Transport>) -> Self {
        Self::with_bus(storage, ChangeBus::new(Arc::new(LocalBus::new()), remote))
    }

    /// A context over an explicit bus.
    pub fn with_bus(storage: Arc<S>, bus: ChangeBus) -> Self {
        Self {
            storage,
            bus,
            codec: JsonCodec,
            config: BindingConfig::default(),
        }
    }
}

impl Context<MemoryStorage> {
    /// A private, non-persistent context.
    pub fn in_memory() -> Self {
        Self::standalone(MemoryStorage::new())
    }
}

impl Context<OriginStorage> {
    /// Open a new context on an in-process origin.
    ///
    /// Writes made here reach every other context of the origin through
    /// its native events.
    pub fn in_origin(origin: &Arc<MemoryOrigin>) -> Self {
        let opened = origin.create_context();
        Self::new(opened.storage, opened.events)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod sqlite {
    use std::path::Path;
    use std::sync::Arc;

    use slotsync_bus::{SqliteWatcher, Transport, WatchConfig};
    use slotsync_store::SqliteStorage;

    use super::Context;
    use crate::error::Result;

    impl Context<SqliteStorage> {
        /// Open a context on a SQLite file shared with other processes.
        ///
        /// The returned watcher is this context's cross-context channel.
        /// Nothing arrives until it is polled, or spawned on a tokio runtime.
        pub fn open_sqlite(
            path: impl AsRef<Path>,
            watch: WatchConfig,
        ) -> Result<(Self, Arc<SqliteWatcher>)> {
            let storage = Arc::new(SqliteStorage::open(path)?);
            Self::watch_sqlite(storage, watch)
        }

        /// Attach a context to an already open SQLite medium.
        pub fn watch_sqlite(
            storage: Arc<SqliteStorage>,
            watch: WatchConfig,
        ) -> Result<(Self, Arc<SqliteWatcher>)> {
            let watcher = SqliteWatcher::new(Arc::clone(&storage), watch)?;
            tracing::debug!(writer = %storage.writer(), "sqlite context opened");
            let remote: Arc<dyn Transport> = watcher.clone();
            Ok((Self::from_shared(storage, remote), watcher))
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::sync::Arc;

    use slotsync_bus::{ChangeBus, StorageEventTransport, WindowLocalChannel};
    use slotsync_store::LocalStorage;

    use super::Context;
    use crate::error::Result;

    impl Context<LocalStorage> {
        /// The current tab's `localStorage`.
        ///
        /// Fails with an unavailable-storage error outside a browser
        /// window; render with
        /// [`get_server_snapshot`](crate::Binding::get_server_snapshot)
        /// there instead.
        pub fn browser() -> Result<Self> {
            let storage = LocalStorage::open()?;
            let bus = ChangeBus::new(Arc::new(WindowLocalChannel), Arc::new(StorageEventTransport));
            Ok(Self::with_bus(Arc::new(storage), bus))
        }
    }
}

impl<S: Storage + ?Sized, C: Codec> Context<S, C> {
    /// Switch the codec used by bindings created from now on.
    pub fn with_codec<D: Codec>(self, codec: D) -> Context<S, D> {
        Context {
            storage: self.storage,
            bus: self.bus,
            codec,
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Bind `key`, migrating legacy content first when configured.
    ///
    /// `initial_value` is what reads return while the slot is absent or
    /// corrupt. It is never written.
    pub fn bind<T>(&self, key: impl Into<String>, initial_value: Option<T>) -> Binding<T, S, C>
    where
        T: Serialize + DeserializeOwned,
    {
        Binding::attach(
            key.into(),
            initial_value,
            Arc::clone(&self.storage),
            self.codec.clone(),
            self.bus.clone(),
            self.config,
        )
    }
}

impl<S: ?Sized, C: Clone> Clone for Context<S, C> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            bus: self.bus.clone(),
            codec: self.codec.clone(),
            config: self.config,
        }
    }
}

impl<S: ?Sized, C: Codec> fmt::Debug for Context<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("codec", &self.codec.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
