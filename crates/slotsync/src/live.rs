//! A memoized live view of one key.
//!
//! [`LiveValue`] subscribes to its binding once and marks itself dirty on
//! every notification. Work is deferred to [`LiveValue::get`], which
//! re-reads the raw snapshot and decodes only when the raw string actually
//! changed. Repeated reads between changes cost one comparison.
//!
//! Invariants:
//!
//! 1. `get()` never returns a value older than the last notification.
//! 2. `version()` bumps exactly once per observed change of the raw snapshot.
//! 3. Dropping the view releases its listeners.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use slotsync_bus::Subscription;
use slotsync_core::{Codec, JsonCodec};
use slotsync_store::Storage;

use crate::binding::Binding;

struct Cached<T> {
    raw: Option<String>,
    value: Option<T>,
}

/// A decoded value kept in step with its slot.
pub struct LiveValue<T, S: ?Sized, C = JsonCodec> {
    binding: Binding<T, S, C>,
    dirty: Arc<AtomicBool>,
    cache: Mutex<Option<Cached<T>>>,
    version: AtomicU64,
    subscription: Subscription,
}

impl<T, S, C> LiveValue<T, S, C>
where
    T: Serialize + DeserializeOwned + Clone,
    S: Storage + ?Sized,
    C: Codec,
{
    pub fn new(binding: Binding<T, S, C>) -> Self {
        Self::with_callback(binding, || {})
    }

    /// Like [`new`](Self::new), also calling `on_change` after the view is
    /// marked dirty, so a consumer can schedule a re-render.
    pub fn with_callback<F>(binding: Binding<T, S, C>, on_change: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        let subscription = binding.subscribe(move || {
            flag.store(true, Ordering::Release);
            on_change();
        });

        Self {
            binding,
            dirty,
            cache: Mutex::new(None),
            version: AtomicU64::new(0),
            subscription,
        }
    }

    /// The current value, re-decoded only if the raw slot changed.
    pub fn get(&self) -> Option<T> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        if self.dirty.swap(false, Ordering::AcqRel) {
            let raw = self.binding.get_snapshot();
            let changed = cache.as_ref().map_or(true, |cached| cached.raw != raw);
            if changed {
                let value = self.binding.decode_snapshot(raw.as_deref());
                *cache = Some(Cached { raw, value });
                self.version.fetch_add(1, Ordering::AcqRel);
            }
        }

        cache.as_ref().and_then(|cached| cached.value.clone())
    }

    /// Force the next [`get`](Self::get) to re-read the slot.
    ///
    /// Needed only after the medium was changed without an announcement.
    pub fn invalidate(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

impl<T, S: ?Sized, C> LiveValue<T, S, C> {
    /// Number of distinct raw snapshots decoded so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Whether a notification arrived since the last [`get`](Self::get).
    pub fn is_stale(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn binding(&self) -> &Binding<T, S, C> {
        &self.binding
    }

    /// Stop following the slot. `get` keeps returning the last value.
    pub fn detach(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

impl<T, S: ?Sized, C> fmt::Debug for LiveValue<T, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveValue")
            .field("key", &self.subscription.key())
            .field("version", &self.version())
            .field("stale", &self.is_stale())
            .finish_non_exhaustive()
    }
}
