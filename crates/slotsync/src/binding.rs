//! The per-key accessor.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use slotsync_bus::{ChangeBus, Subscription};
use slotsync_core::{Codec, Envelope, JsonCodec, SlotState};
use slotsync_store::Storage;

use crate::config::BindingConfig;
use crate::error::Result;
use crate::live::LiveValue;
use crate::migrate::{migrate, MigrationOutcome};
use crate::snapshot::SnapshotStore;

/// A typed accessor bound to one key of a context's storage.
///
/// The binding is the only writer of envelopes for its key from its own
/// point of view. Every write and clear replaces the whole slot and is then
/// announced on the context's same-context channel, so other bindings of
/// the same key in this context observe it.
///
/// Bindings are created with [`Context::bind`](crate::Context::bind).
pub struct Binding<T, S: ?Sized, C = JsonCodec> {
    key: String,
    initial_value: Option<T>,
    storage: Arc<S>,
    codec: C,
    bus: ChangeBus,
    config: BindingConfig,
    migration: MigrationOutcome,
}

impl<T, S, C> Binding<T, S, C>
where
    T: Serialize + DeserializeOwned,
    S: Storage + ?Sized,
    C: Codec,
{
    pub(crate) fn attach(
        key: String,
        initial_value: Option<T>,
        storage: Arc<S>,
        codec: C,
        bus: ChangeBus,
        config: BindingConfig,
    ) -> Self {
        let migration = if config.migrate_on_attach {
            let outcome = migrate(storage.as_ref(), &codec, &key);
            // Readers memoized on the legacy string must re-read.
            if outcome.rewrote() && config.notify_on_write {
                bus.notify(&key);
            }
            outcome
        } else {
            MigrationOutcome::Skipped
        };

        Self {
            key,
            initial_value,
            storage,
            codec,
            bus,
            config,
            migration,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn initial_value(&self) -> Option<&T> {
        self.initial_value.as_ref()
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// What migration did when this binding attached.
    pub fn migration(&self) -> &MigrationOutcome {
        &self.migration
    }

    /// Decode the slot without collapsing absent, cleared and corrupt.
    pub fn read_state(&self) -> SlotState<T> {
        let raw = self.get_snapshot();
        self.decode_state(raw.as_deref())
    }

    /// Read the current value.
    ///
    /// - absent slot: the initial value
    /// - cleared slot: `None`, whatever the initial value
    /// - corrupt slot: the initial value (logged)
    pub fn read(&self) -> Option<T>
    where
        T: Clone,
    {
        self.read_state().resolve(self.initial_value.clone())
    }

    /// Replace the slot with `value` and announce the change.
    pub fn write(&self, value: &T) -> Result<()> {
        let raw = self.codec.encode(&Envelope::value(value))?;
        self.replace(&raw)
    }

    /// Replace the slot with the clear marker and announce the change.
    ///
    /// The slot keeps an entry, so a cleared key reads as `None` even for
    /// bindings with an initial value.
    pub fn clear(&self) -> Result<()> {
        let raw = self.codec.encode(&Envelope::<()>::Cleared)?;
        self.replace(&raw)
    }

    fn replace(&self, raw: &str) -> Result<()> {
        self.storage.set_item(&self.key, raw)?;
        tracing::debug!(key = %self.key, codec = self.codec.name(), "slot replaced");

        if self.config.notify_on_write {
            self.bus.notify(&self.key);
        }
        Ok(())
    }

    /// The raw slot content, `None` when the key has no entry.
    ///
    /// Side-effect free. A medium that fails to answer is treated as absent.
    pub fn get_snapshot(&self) -> Option<String> {
        match self.storage.get_item(&self.key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "slot read failed, treating as absent");
                None
            }
        }
    }

    /// Snapshot for environments without a storage medium. Always `None`.
    pub fn get_server_snapshot(&self) -> Option<String> {
        None
    }

    /// Call `on_change` whenever this key may have changed, from this
    /// context or another one sharing the medium.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bus.subscribe(self.key.clone(), on_change)
    }

    /// Decode a raw snapshot the way [`read`](Self::read) does.
    pub fn decode_snapshot(&self, raw: Option<&str>) -> Option<T>
    where
        T: Clone,
    {
        self.decode_state(raw).resolve(self.initial_value.clone())
    }

    /// A memoized, self-refreshing view of this key.
    pub fn live(&self) -> LiveValue<T, S, C>
    where
        T: Clone,
    {
        LiveValue::new(self.clone())
    }

    fn decode_state(&self, raw: Option<&str>) -> SlotState<T> {
        let state = SlotState::from_raw(&self.codec, raw);
        match &state {
            SlotState::Corrupt { reason } => tracing::warn!(
                key = %self.key,
                codec = self.codec.name(),
                reason = %reason,
                "corrupt slot, falling back to initial value"
            ),
            state => tracing::trace!(key = %self.key, state = state.label(), "slot decoded"),
        }
        state
    }
}

impl<T, S, C> SnapshotStore for Binding<T, S, C>
where
    T: Serialize + DeserializeOwned,
    S: Storage + ?Sized,
    C: Codec,
{
    fn get_snapshot(&self) -> Option<String> {
        Binding::get_snapshot(self)
    }

    fn get_server_snapshot(&self) -> Option<String> {
        Binding::get_server_snapshot(self)
    }

    fn subscribe(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Subscription {
        Binding::subscribe(self, on_change)
    }
}

impl<T: Clone, S: ?Sized, C: Clone> Clone for Binding<T, S, C> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            initial_value: self.initial_value.clone(),
            storage: Arc::clone(&self.storage),
            codec: self.codec.clone(),
            bus: self.bus.clone(),
            config: self.config,
            migration: self.migration.clone(),
        }
    }
}

impl<T: fmt::Debug, S: ?Sized, C: Codec> fmt::Debug for Binding<T, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("initial_value", &self.initial_value)
            .field("codec", &self.codec.name())
            .field("migration", &self.migration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;
    use slotsync_core::{CborCodec, EnvelopeKind};
    use slotsync_store::{MemoryStorage, StorageError};

    use super::*;
    use crate::context::Context;
    use crate::error::SlotError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        font_size: u8,
    }

    fn hits() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&hits);
        (hits, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_counter_scenario() {
        let context = Context::in_memory();
        let counter = context.bind("counter", Some(0_i64));
        assert_eq!(counter.read(), Some(0));

        counter.write(&5).unwrap();
        assert_eq!(counter.read(), Some(5));

        counter.clear().unwrap();
        assert_eq!(counter.read(), None);

        let rebound = context.bind("counter", Some(0_i64));
        assert_eq!(rebound.read(), None);
        assert_eq!(rebound.read_state(), SlotState::Cleared);
    }

    #[test]
    fn test_struct_payload() {
        let context = Context::in_memory();
        let prefs = context.bind::<Prefs>("prefs", None);
        assert_eq!(prefs.read(), None);

        let value = Prefs {
            theme: "dark".into(),
            font_size: 14,
        };
        prefs.write(&value).unwrap();
        assert_eq!(prefs.read(), Some(value));
        assert_eq!(
            prefs.get_snapshot().as_deref(),
            Some(r#"{"type":"value","value":{"theme":"dark","font_size":14}}"#)
        );
    }

    #[test]
    fn test_corrupt_slot_reads_initial_value() {
        let context = Context::in_memory().with_config(BindingConfig::read_only());
        context.storage().set_item("n", "{not json").unwrap();

        let n = context.bind("n", Some(3_u32));
        assert!(n.read_state().is_corrupt());
        assert_eq!(n.read(), Some(3));
    }

    #[test]
    fn test_type_mismatch_reads_initial_value() {
        let context = Context::in_memory();
        context.bind("n", None::<String>).write(&"text".to_string()).unwrap();

        let as_number = context.bind("n", Some(1_u32));
        assert_eq!(as_number.read(), Some(1));
    }

    #[test]
    fn test_write_announces_to_other_bindings() {
        let context = Context::in_memory();
        let writer = context.bind("theme", Some("light".to_string()));
        let reader = context.bind("theme", Some("light".to_string()));

        let (count, on_change) = hits();
        let _sub = reader.subscribe(on_change);

        writer.write(&"dark".to_string()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(reader.read().as_deref(), Some("dark"));

        writer.clear().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(reader.read(), None);
    }

    #[test]
    fn test_notify_on_write_can_be_disabled() {
        let context = Context::in_memory().with_config(BindingConfig {
            notify_on_write: false,
            ..BindingConfig::default()
        });
        let binding = context.bind("k", None::<u8>);
        let (count, on_change) = hits();
        let _sub = binding.subscribe(on_change);

        binding.write(&1).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(binding.read(), Some(1));
    }

    #[test]
    fn test_attach_migrates_and_announces() {
        let context = Context::in_memory();
        context.storage().set_item("legacy", "7").unwrap();
        let (count, on_change) = hits();
        let _sub = context.bus().subscribe("legacy", on_change);

        let binding = context.bind("legacy", Some(0_u32));
        assert_eq!(binding.migration(), &MigrationOutcome::WrappedDocument);
        assert_eq!(binding.read(), Some(7));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let again = context.bind("legacy", Some(0_u32));
        assert_eq!(
            again.migration(),
            &MigrationOutcome::AlreadyEnveloped(EnvelopeKind::Value)
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_only_config_skips_migration() {
        let context = Context::in_memory().with_config(BindingConfig::read_only());
        context.storage().set_item("legacy", "7").unwrap();

        let binding = context.bind("legacy", Some(0_u32));
        assert_eq!(binding.migration(), &MigrationOutcome::Skipped);
        assert_eq!(binding.get_snapshot().as_deref(), Some("7"));
        assert_eq!(binding.read(), Some(0));
    }

    #[test]
    fn test_snapshot_contract() {
        let context = Context::in_memory();
        let binding = context.bind("k", Some(1_u8));
        assert_eq!(binding.get_snapshot(), None);
        assert_eq!(binding.get_server_snapshot(), None);

        binding.write(&2).unwrap();
        assert!(binding.get_snapshot().is_some());
        assert_eq!(binding.get_server_snapshot(), None);

        assert_eq!(binding.decode_snapshot(None), Some(1));
        assert_eq!(binding.decode_snapshot(Some("garbage")), Some(1));
        assert_eq!(binding.decode_snapshot(Some(r#"{"type":"cleared"}"#)), None);
        assert_eq!(
            binding.decode_snapshot(binding.get_snapshot().as_deref()),
            Some(2)
        );
    }

    #[test]
    fn test_snapshot_store_trait_object() {
        let context = Context::in_memory();
        let binding = context.bind("k", None::<u8>);
        let store: &dyn SnapshotStore = &binding;

        let (count, on_change) = hits();
        let sub = store.subscribe(Box::new(on_change));
        binding.write(&9).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_snapshot(), binding.get_snapshot());

        sub.unsubscribe();
        binding.write(&10).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cbor_binding() {
        let context = Context::in_memory().with_codec(CborCodec);
        let binding = context.bind("bytes", None::<Vec<u8>>);
        binding.write(&vec![1, 2, 3]).unwrap();

        let raw = binding.get_snapshot().unwrap();
        assert!(raw.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(binding.read(), Some(vec![1, 2, 3]));
    }

    struct FullStorage;

    impl Storage for FullStorage {
        fn get_item(&self, _key: &str) -> slotsync_store::Result<Option<String>> {
            Ok(None)
        }

        fn set_item(&self, _key: &str, _value: &str) -> slotsync_store::Result<()> {
            Err(StorageError::Backend("quota exceeded".into()))
        }

        fn remove_item(&self, _key: &str) -> slotsync_store::Result<()> {
            Ok(())
        }

        fn keys(&self) -> slotsync_store::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn clear(&self) -> slotsync_store::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_surfaces_and_skips_notify() {
        let context = Context::standalone(FullStorage);
        let binding = context.bind("k", Some(1_u8));
        let (count, on_change) = hits();
        let _sub = binding.subscribe(on_change);

        assert!(matches!(binding.write(&2), Err(SlotError::Storage(_))));
        assert!(matches!(binding.clear(), Err(SlotError::Storage(_))));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(binding.read(), Some(1));
    }

    #[test]
    fn test_clone_shares_slot() {
        let context = Context::standalone(MemoryStorage::new());
        let a = context.bind("k", None::<u8>);
        let b = a.clone();
        a.write(&4).unwrap();
        assert_eq!(b.read(), Some(4));
        assert_eq!(b.key(), "k");
    }
}
