//! Listener registry shared by every transport.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::event::ChangeSignal;
use crate::transport::Transport;

/// A change listener.
pub type Listener = Arc<dyn Fn(&ChangeSignal) + Send + Sync>;

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Id-keyed set of listeners.
///
/// Dispatch copies the listener list and releases the lock before calling
/// anything, so listeners may add or remove listeners while being notified.
/// Listeners are called in registration order.
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<BTreeMap<ListenerId, Listener>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a listener.
    pub fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, listener);
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a signal to every listener. Returns how many were called.
    pub fn dispatch(&self, signal: &ChangeSignal) -> usize {
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();

        tracing::trace!(listeners = snapshot.len(), ?signal, "dispatching change signal");
        for listener in &snapshot {
            listener(signal);
        }
        snapshot.len()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// A bare registry is a transport that only fires when dispatched to
/// directly. Contexts without a cross-context medium use one.
impl Transport for ListenerRegistry {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.remove(id)
    }
}
