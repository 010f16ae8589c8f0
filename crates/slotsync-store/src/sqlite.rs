//! SQLite implementation of the Storage trait.
//!
//! This is the persistent medium for native targets. Every process (or every
//! `SqliteStorage` instance) that opens the same file sees the same slots,
//! which makes each instance one execution context of a shared origin.
//!
//! Alongside the slot table, every effective mutation appends a row to the
//! `slot_changes` log, stamped with the writer id of the instance that made
//! it. Other instances read the log to learn about writes they did not make.

use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::error::{Result, StorageError};
use crate::migration;
use crate::traits::Storage;

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity of one writer of a SQLite medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriterId(pub u64);

impl WriterId {
    /// A fresh random writer id.
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A change recorded in the log by some writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChange {
    /// Log sequence number, strictly increasing.
    pub seq: i64,
    /// Changed key, `None` when the whole medium was cleared.
    pub key: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change, `None` when the key was removed.
    pub new_value: Option<String>,
    /// Hex writer id of the instance that made the change.
    pub writer: String,
    /// When the change was made (Unix ms).
    pub changed_at: i64,
}

/// SQLite-based storage.
///
/// Thread-safe via an internal Mutex.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    writer: WriterId,
}

impl SqliteStorage {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and missing parent directories) and runs schema
    /// migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_as(path, WriterId::random())
    }

    /// Open with an explicit writer id.
    pub fn open_as(path: impl AsRef<Path>, writer: WriterId) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets readers in other processes proceed while one writes.
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::from_connection(conn, writer)
    }

    /// Open an in-memory SQLite database.
    ///
    /// The database is private to this instance. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, WriterId::random())
    }

    fn from_connection(mut conn: Connection, writer: WriterId) -> Result<Self> {
        migration::migrate(&mut conn)?;
        tracing::debug!(writer = %writer, "opened sqlite slot storage");
        Ok(Self {
            conn: Mutex::new(conn),
            writer,
        })
    }

    /// This instance's writer id.
    pub fn writer(&self) -> WriterId {
        self.writer
    }

    /// Highest sequence number currently in the change log (0 when empty).
    pub fn latest_change_seq(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM slot_changes",
                [],
                |row| row.get(0),
            )?)
        })
    }

    /// Changes made by other writers after `after_seq`, ordered by seq.
    pub fn changes_since(&self, after_seq: i64) -> Result<Vec<SlotChange>> {
        let writer = self.writer.to_hex();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, key, old_value, new_value, writer, changed_at
                 FROM slot_changes
                 WHERE seq > ?1 AND writer != ?2
                 ORDER BY seq",
            )?;
            let changes = stmt
                .query_map(params![after_seq, writer], |row| {
                    Ok(SlotChange {
                        seq: row.get(0)?,
                        key: row.get(1)?,
                        old_value: row.get(2)?,
                        new_value: row.get(3)?,
                        writer: row.get(4)?,
                        changed_at: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(changes)
        })
    }

    /// Delete change log rows older than `before_ms`. Returns rows deleted.
    pub fn prune_changes(&self, before_ms: i64) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM slot_changes WHERE changed_at < ?1",
                params![before_ms],
            )?)
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StorageError::poisoned())?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StorageError::poisoned())?;
        f(&mut conn)
    }

    fn record_change(
        &self,
        conn: &Connection,
        key: Option<&str>,
        old_value: Option<&str>,
        new_value: Option<&str>,
        at: i64,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO slot_changes (key, old_value, new_value, writer, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, old_value, new_value, self.writer.to_hex(), at],
        )?;
        Ok(())
    }
}

fn current_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM slots WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

impl Storage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| current_value(conn, key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let old = current_value(&tx, key)?;
            if old.as_deref() == Some(value) {
                return Ok(());
            }

            let now = now_millis();
            tx.execute(
                "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            self.record_change(&tx, Some(key), old.as_deref(), Some(value), now)?;

            tx.commit()?;
            Ok(())
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(old) = current_value(&tx, key)? else {
                return Ok(());
            };

            tx.execute("DELETE FROM slots WHERE key = ?1", params![key])?;
            self.record_change(&tx, Some(key), Some(&old), None, now_millis())?;

            tx.commit()?;
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM slots ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let removed = tx.execute("DELETE FROM slots", [])?;
            if removed > 0 {
                self.record_change(&tx, None, None, None, now_millis())?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM slots", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::memory::MemoryStorage;

    #[test]
    fn test_sqlite_storage_basic() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert_eq!(storage.get_item("theme").unwrap(), None);

        storage.set_item("theme", "dark").unwrap();
        storage.set_item("theme", "light").unwrap();
        assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("light"));

        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["a", "theme"]);
        assert_eq!(storage.len().unwrap(), 2);

        storage.remove_item("a").unwrap();
        storage.remove_item("a").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["theme"]);

        storage.clear().unwrap();
        assert!(storage.is_empty().unwrap());
    }

    #[test]
    fn test_own_changes_are_not_reported() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.set_item("k", "v").unwrap();
        assert!(storage.changes_since(0).unwrap().is_empty());
        assert_eq!(storage.latest_change_seq().unwrap(), 1);
    }

    #[test]
    fn test_shared_file_reports_foreign_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("slots.db");

        let tab_a = SqliteStorage::open_as(&path, WriterId(1)).unwrap();
        let tab_b = SqliteStorage::open_as(&path, WriterId(2)).unwrap();
        let cursor = tab_b.latest_change_seq().unwrap();

        tab_a.set_item("counter", "1").unwrap();
        tab_a.set_item("counter", "1").unwrap(); // unchanged, not logged
        tab_a.set_item("counter", "2").unwrap();
        tab_a.remove_item("counter").unwrap();
        tab_a.set_item("other", "x").unwrap();
        tab_a.clear().unwrap();

        assert_eq!(tab_b.get_item("other").unwrap(), None);

        let changes = tab_b.changes_since(cursor).unwrap();
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.key.as_deref(), c.old_value.as_deref(), c.new_value.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("counter"), None, Some("1")),
                (Some("counter"), Some("1"), Some("2")),
                (Some("counter"), Some("2"), None),
                (Some("other"), None, Some("x")),
                (None, None, None),
            ]
        );
        assert!(changes.iter().all(|c| c.writer == WriterId(1).to_hex()));
        assert!(changes.windows(2).all(|w| w[0].seq < w[1].seq));

        // The writer itself sees none of them.
        assert!(tab_a.changes_since(cursor).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slots.db");
        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.set_item("kept", "yes").unwrap();
        }
        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("kept").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn test_prune_changes() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();

        assert_eq!(storage.prune_changes(0).unwrap(), 0);
        assert_eq!(storage.prune_changes(now_millis() + 1_000).unwrap(), 2);
        // Sequence numbers keep growing after a prune.
        storage.set_item("c", "3").unwrap();
        assert_eq!(storage.latest_change_seq().unwrap(), 3);
    }

    #[test]
    fn test_writer_id_hex() {
        assert_eq!(WriterId(0xab).to_hex(), "00000000000000ab");
        assert_eq!(WriterId(0xab).to_string(), "00000000000000ab");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(String, String),
        Remove(String),
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        let key = "[a-c]";
        prop_oneof![
            6 => (key, "[xy]{0,2}").prop_map(|(k, v)| Op::Set(k, v)),
            3 => key.prop_map(Op::Remove),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn test_matches_memory_model(ops in prop::collection::vec(op(), 0..40)) {
            let model = MemoryStorage::new();
            let storage = SqliteStorage::open_memory().unwrap();
            let mut effective = 0i64;

            for op in &ops {
                match op {
                    Op::Set(k, v) => {
                        if model.replace(k, v).unwrap().as_deref() != Some(v.as_str()) {
                            effective += 1;
                        }
                        storage.set_item(k, v).unwrap();
                    }
                    Op::Remove(k) => {
                        if model.take(k).unwrap().is_some() {
                            effective += 1;
                        }
                        storage.remove_item(k).unwrap();
                    }
                    Op::Clear => {
                        if model.drain().unwrap() > 0 {
                            effective += 1;
                        }
                        storage.clear().unwrap();
                    }
                }
            }

            prop_assert_eq!(storage.keys().unwrap(), model.keys().unwrap());
            for key in model.keys().unwrap() {
                prop_assert_eq!(storage.get_item(&key).unwrap(), model.get_item(&key).unwrap());
            }
            // One log row per effective mutation.
            prop_assert_eq!(storage.latest_change_seq().unwrap(), effective);
        }
    }
}
