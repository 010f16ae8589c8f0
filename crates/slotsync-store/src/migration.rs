//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration transforms the
//! schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StorageError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::sqlite::now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated slot schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StorageError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: slot table.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per key; value is replaced wholesale on every write
        CREATE TABLE slots (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL       -- Unix ms of last write
        );
        "#,
    )?;

    Ok(())
}

/// Migration v2: change log, read by other processes to observe writes.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE slot_changes (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT,                         -- NULL when the whole medium was cleared
            old_value TEXT,
            new_value TEXT,                   -- NULL when the key was removed
            writer TEXT NOT NULL,             -- writer id of the connection that made the change
            changed_at INTEGER NOT NULL
        );

        CREATE INDEX idx_slot_changes_changed_at ON slot_changes(changed_at);
        "#,
    )?;

    Ok(())
}
