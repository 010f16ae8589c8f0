//! Transport abstraction for change signals.
//!
//! A transport is anything that can deliver [`ChangeSignal`]s to registered
//! listeners. Bindings never talk to a concrete transport; they receive one
//! through a [`ChangeBus`](crate::ChangeBus).

use crate::registry::{Listener, ListenerId};

/// Receiving side of a change channel.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait Transport: Send + Sync {
    /// Register a listener for every signal this transport delivers.
    fn add_listener(&self, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Same-context channel: a transport this context can also announce on.
pub trait LocalChannel: Transport {
    /// Announce a write or clear of `key` to listeners in this context.
    ///
    /// Delivery is synchronous: every listener has run when this returns.
    fn announce(&self, key: &str);
}

/// An in-process storage origin shared by several contexts.
///
/// Models a browser origin: one medium, many tabs. A write through one
/// context's [`OriginStorage`] delivers a native [`StorageEvent`] to every
/// *other* context, never to the writer.
pub mod memory {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, RwLock};

    use slotsync_store::{MemoryStorage, Result, Storage};

    use crate::event::{ChangeSignal, StorageEvent};
    use crate::registry::ListenerRegistry;

    /// Identity of a context within a [`MemoryOrigin`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ContextId(pub u64);

    /// Shared state for an in-process origin.
    pub struct MemoryOrigin {
        /// The one medium every context reads and writes.
        storage: MemoryStorage,
        /// Native event receivers of each open context.
        contexts: RwLock<BTreeMap<ContextId, Arc<ListenerRegistry>>>,
        next_id: AtomicU64,
    }

    impl MemoryOrigin {
        /// Create a new origin with an empty medium.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Open a new context on this origin.
        pub fn create_context(self: &Arc<Self>) -> OriginContext {
            let id = ContextId(self.next_id.fetch_add(1, Ordering::Relaxed));
            let events = Arc::new(ListenerRegistry::new());

            self.contexts
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(id, Arc::clone(&events));
            tracing::debug!(context = id.0, "opened origin context");

            OriginContext {
                id,
                storage: OriginStorage {
                    id,
                    origin: Arc::clone(self),
                },
                events,
            }
        }

        /// Close a context; it stops receiving native events.
        pub fn close_context(&self, id: ContextId) -> bool {
            self.contexts
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id)
                .is_some()
        }

        /// Number of open contexts.
        pub fn context_count(&self) -> usize {
            self.contexts
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .len()
        }

        /// Direct access to the medium, bypassing change events.
        ///
        /// Writes made here behave like data left by an earlier session.
        pub fn storage(&self) -> &MemoryStorage {
            &self.storage
        }

        fn broadcast(&self, from: ContextId, event: StorageEvent) {
            let receivers: Vec<Arc<ListenerRegistry>> = self
                .contexts
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .filter(|(id, _)| **id != from)
                .map(|(_, registry)| Arc::clone(registry))
                .collect();

            let signal = ChangeSignal::Storage(event);
            for registry in receivers {
                registry.dispatch(&signal);
            }
        }
    }

    impl Default for MemoryOrigin {
        fn default() -> Self {
            Self {
                storage: MemoryStorage::new(),
                contexts: RwLock::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }
        }
    }

    /// One context of a [`MemoryOrigin`].
    pub struct OriginContext {
        pub id: ContextId,
        /// This context's view of the medium.
        pub storage: OriginStorage,
        /// Native events from the other contexts.
        pub events: Arc<ListenerRegistry>,
    }

    /// A context's handle on the origin medium.
    ///
    /// Effective mutations (the stored value actually changes) notify every
    /// other context of the origin.
    #[derive(Clone)]
    pub struct OriginStorage {
        id: ContextId,
        origin: Arc<MemoryOrigin>,
    }

    impl OriginStorage {
        pub fn context_id(&self) -> ContextId {
            self.id
        }
    }

    impl Storage for OriginStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.origin.storage.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            let old = self.origin.storage.replace(key, value)?;
            if old.as_deref() != Some(value) {
                self.origin.broadcast(
                    self.id,
                    StorageEvent::for_key(key, old, Some(value.to_string())),
                );
            }
            Ok(())
        }

        fn remove_item(&self, key: &str) -> Result<()> {
            if let Some(old) = self.origin.storage.take(key)? {
                self.origin
                    .broadcast(self.id, StorageEvent::for_key(key, Some(old), None));
            }
            Ok(())
        }

        fn keys(&self) -> Result<Vec<String>> {
            self.origin.storage.keys()
        }

        fn clear(&self) -> Result<()> {
            if self.origin.storage.drain()? > 0 {
                self.origin.broadcast(self.id, StorageEvent::cleared());
            }
            Ok(())
        }

        fn len(&self) -> Result<usize> {
            self.origin.storage.len()
        }
    }
}
