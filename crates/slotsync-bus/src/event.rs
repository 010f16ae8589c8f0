//! Change signals carried by the bus.

/// The medium's native cross-context change event.
///
/// Mirrors the browser `StorageEvent`. Subscribers must re-read the slot
/// rather than trust `old_value`/`new_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key, `None` when the whole medium was cleared.
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// Event for a single key.
    pub fn for_key(
        key: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value,
        }
    }

    /// Event for a whole-medium clear.
    pub fn cleared() -> Self {
        Self {
            key: None,
            old_value: None,
            new_value: None,
        }
    }

    /// Whether a reader of `key` has to re-check its slot.
    ///
    /// A key-less event may have touched any key.
    pub fn affects(&self, key: &str) -> bool {
        match &self.key {
            Some(changed) => changed == key,
            None => true,
        }
    }
}

/// A signal delivered to bus listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSignal {
    /// A write or clear made in this context.
    Local {
        /// The written key.
        key: String,
    },
    /// A change made by another context.
    Storage(StorageEvent),
}

impl ChangeSignal {
    pub fn local(key: impl Into<String>) -> Self {
        ChangeSignal::Local { key: key.into() }
    }

    /// Whether a subscriber to `key` should be woken by this signal.
    pub fn concerns(&self, key: &str) -> bool {
        match self {
            ChangeSignal::Local { key: written } => written == key,
            ChangeSignal::Storage(event) => event.affects(key),
        }
    }
}
