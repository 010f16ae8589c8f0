//! The change bus: both channels behind one subscribe contract.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::event::ChangeSignal;
use crate::registry::{Listener, ListenerId};
use crate::transport::{LocalChannel, Transport};

/// Composes a same-context channel with a cross-context transport.
///
/// Cheap to clone; clones share both channels.
#[derive(Clone)]
pub struct ChangeBus {
    local: Arc<dyn LocalChannel>,
    remote: Arc<dyn Transport>,
}

impl ChangeBus {
    /// Build a bus from a same-context channel and a cross-context transport.
    pub fn new(local: Arc<dyn LocalChannel>, remote: Arc<dyn Transport>) -> Self {
        Self { local, remote }
    }

    /// Announce a local write or clear of `key`.
    pub fn notify(&self, key: &str) {
        self.local.announce(key);
    }

    /// Subscribe to changes of `key` from either channel.
    ///
    /// Local signals match on key equality. Native signals match on their key
    /// metadata; a key-less native signal (whole-medium clear) always
    /// matches. `on_change` carries no value: re-read the slot.
    pub fn subscribe<F>(&self, key: impl Into<String>, on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let key = key.into();
        let on_change = Arc::new(on_change);

        let filtered = {
            let key = key.clone();
            move |signal: &ChangeSignal| {
                if signal.concerns(&key) {
                    on_change();
                }
            }
        };
        let listener: Listener = Arc::new(filtered);

        let local_id = self.local.add_listener(Arc::clone(&listener));
        let remote_id = self.remote.add_listener(listener);
        tracing::trace!(key = %key, "subscribed to slot changes");

        Subscription {
            key,
            registrations: Mutex::new(Some(Registrations {
                local: Arc::clone(&self.local),
                local_id,
                remote: Arc::clone(&self.remote),
                remote_id,
            })),
        }
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus").finish_non_exhaustive()
    }
}

struct Registrations {
    local: Arc<dyn LocalChannel>,
    local_id: ListenerId,
    remote: Arc<dyn Transport>,
    remote_id: ListenerId,
}

/// A live subscription on both channels.
///
/// Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    key: String,
    registrations: Mutex<Option<Registrations>>,
}

impl Subscription {
    /// The subscribed key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Remove both listeners. Idempotent; returns `true` only the first time.
    pub fn unsubscribe(&self) -> bool {
        let taken = self
            .registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match taken {
            Some(reg) => {
                reg.local.remove_listener(reg.local_id);
                reg.remote.remove_listener(reg.remote_id);
                tracing::trace!(key = %self.key, "unsubscribed from slot changes");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}
