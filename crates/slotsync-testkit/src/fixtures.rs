//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use slotsync::Context;
use slotsync_bus::{MemoryOrigin, OriginStorage, SqliteWatcher, WatchConfig};
use slotsync_store::{SqliteStorage, Storage, WriterId};
use tempfile::TempDir;

/// Several contexts ("tabs") sharing one in-process origin.
pub struct OriginFixture {
    pub origin: Arc<MemoryOrigin>,
    pub tabs: Vec<Context<OriginStorage>>,
}

impl OriginFixture {
    /// Open an origin with `tabs` contexts.
    pub fn new(tabs: usize) -> Self {
        let origin = MemoryOrigin::new();
        let tabs = (0..tabs).map(|_| Context::in_origin(&origin)).collect();
        Self { origin, tabs }
    }

    pub fn tab(&self, index: usize) -> &Context<OriginStorage> {
        &self.tabs[index]
    }

    /// Leave raw content in the medium, as an earlier session would.
    ///
    /// No context is notified.
    pub fn seed(&self, key: &str, raw: &str) {
        self.origin
            .storage()
            .set_item(key, raw)
            .expect("memory storage never fails");
    }

    /// Raw content of a slot.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.origin
            .storage()
            .get_item(key)
            .expect("memory storage never fails")
    }
}

/// A SQLite file in a temporary directory, opened by several "processes".
pub struct SqliteFixture {
    dir: TempDir,
}

impl SqliteFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("slots.db")
    }

    /// Open the file as writer `writer`, with a watcher that is only polled
    /// by hand.
    pub fn process(&self, writer: u64) -> (Context<SqliteStorage>, Arc<SqliteWatcher>) {
        let storage = SqliteStorage::open_as(self.path(), WriterId(writer))
            .expect("failed to open sqlite fixture");
        Context::watch_sqlite(Arc::new(storage), WatchConfig::default())
            .expect("failed to watch sqlite fixture")
    }

    /// Leave raw content in the file without going through a context.
    pub fn seed(&self, key: &str, raw: &str) {
        seed_file(&self.path(), key, raw);
    }
}

impl Default for SqliteFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_file(path: &Path, key: &str, raw: &str) {
    SqliteStorage::open(path)
        .and_then(|storage| storage.set_item(key, raw))
        .expect("failed to seed sqlite fixture");
}

/// Counts change notifications.
#[derive(Debug, Clone, Default)]
pub struct NotifyCounter {
    hits: Arc<AtomicUsize>,
}

impl NotifyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that bumps this counter.
    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let hits = Arc::clone(&self.hits);
        move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
