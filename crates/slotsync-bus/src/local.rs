//! In-process same-context channel.

use crate::event::ChangeSignal;
use crate::registry::{Listener, ListenerId, ListenerRegistry};
use crate::transport::{LocalChannel, Transport};

/// Synchronous same-context channel.
///
/// Keeps several bindings to the same key in one context consistent, since
/// the medium's native event never reaches the context that wrote.
#[derive(Debug, Default)]
pub struct LocalBus {
    registry: ListenerRegistry,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a change of `key`. Returns how many listeners were called.
    pub fn dispatch(&self, key: &str) -> usize {
        self.registry.dispatch(&ChangeSignal::local(key))
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }
}

impl Transport for LocalBus {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.registry.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.registry.remove(id)
    }
}

impl LocalChannel for LocalBus {
    fn announce(&self, key: &str) {
        self.dispatch(key);
    }
}
