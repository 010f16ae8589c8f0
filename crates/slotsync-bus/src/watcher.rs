//! Native change signal for the SQLite medium.
//!
//! SQLite has no cross-process notification, so the watcher reads the
//! medium's change log and turns every foreign change into a
//! [`StorageEvent`]. Changes made through the watched instance itself are
//! never reported, matching the browser rule that the writing context gets
//! no native event.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use slotsync_store::SqliteStorage;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{BusError, Result};
use crate::event::{ChangeSignal, StorageEvent};
use crate::registry::{Listener, ListenerId, ListenerRegistry};
use crate::transport::Transport;

/// Configuration for change log watching.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// How often the background task reads the change log.
    pub poll_interval: Duration,
    /// How long change log rows are kept before the watcher prunes them.
    pub change_retention: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            change_retention: Duration::from_secs(600),
        }
    }
}

/// Cross-context transport over a shared SQLite file.
pub struct SqliteWatcher {
    storage: Arc<SqliteStorage>,
    registry: ListenerRegistry,
    /// Last change log sequence number delivered.
    cursor: Mutex<i64>,
    config: WatchConfig,
}

impl SqliteWatcher {
    /// Watch `storage`, starting after the newest change already logged.
    pub fn new(storage: Arc<SqliteStorage>, config: WatchConfig) -> Result<Arc<Self>> {
        let cursor = storage.latest_change_seq()?;
        Ok(Arc::new(Self {
            storage,
            registry: ListenerRegistry::new(),
            cursor: Mutex::new(cursor),
            config,
        }))
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Deliver every foreign change logged since the last poll.
    ///
    /// Returns the number of events delivered. Listeners run on the calling
    /// thread, after the cursor has moved past the delivered changes, so a
    /// listener may poll again.
    pub fn poll(&self) -> Result<usize> {
        let changes = {
            let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
            let changes = self.storage.changes_since(*cursor)?;
            if let Some(last) = changes.last() {
                *cursor = last.seq;
            }
            changes
        };

        for change in &changes {
            tracing::debug!(
                key = ?change.key,
                writer = %change.writer,
                seq = change.seq,
                "foreign slot change"
            );
            let event = StorageEvent {
                key: change.key.clone(),
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
            };
            self.registry.dispatch(&ChangeSignal::Storage(event));
        }

        Ok(changes.len())
    }

    /// Drop change log rows older than the configured retention.
    pub fn prune(&self) -> Result<usize> {
        let retention = i64::try_from(self.config.change_retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now_millis().saturating_sub(retention);
        Ok(self.storage.prune_changes(cutoff)?)
    }

    /// Poll in a background task on the current tokio runtime.
    ///
    /// The task stops when the returned handle is dropped.
    pub fn spawn(self: &Arc<Self>) -> Result<WatchHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BusError::NoRuntime(e.to_string()))?;
        let watcher = Arc::clone(self);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(watcher.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_prune = Instant::now();

            loop {
                ticker.tick().await;

                let polling = Arc::clone(&watcher);
                match tokio::task::spawn_blocking(move || polling.poll()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "change log poll failed"),
                    Err(e) => tracing::warn!(error = %e, "change log poll panicked"),
                }

                if last_prune.elapsed() >= watcher.config.change_retention {
                    last_prune = Instant::now();
                    if let Err(e) = watcher.prune() {
                        tracing::warn!(error = %e, "change log prune failed");
                    }
                }
            }
        });

        Ok(WatchHandle { task })
    }
}

impl Transport for SqliteWatcher {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.registry.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.registry.remove(id)
    }
}

/// Handle on a background watcher task. Aborts the task on drop.
#[derive(Debug)]
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the background task.
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
