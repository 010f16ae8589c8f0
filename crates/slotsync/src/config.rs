//! Binding configuration.

/// Configuration shared by every binding a [`Context`](crate::Context)
/// creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingConfig {
    /// Rewrite legacy slot content into an envelope when a binding attaches.
    pub migrate_on_attach: bool,
    /// Announce writes and clears on the same-context channel.
    ///
    /// Turning this off leaves other bindings of the same key in this
    /// context stale until something else signals them.
    pub notify_on_write: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            migrate_on_attach: true,
            notify_on_write: true,
        }
    }
}

impl BindingConfig {
    /// Configuration for a binding that only observes: no migration writes.
    pub fn read_only() -> Self {
        Self {
            migrate_on_attach: false,
            ..Self::default()
        }
    }
}
