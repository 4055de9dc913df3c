//! SQLite-backed store.
//!
//! One connection guarded by a mutex; every public method locks it for the
//! duration of the call. Row-level helpers take a `&Connection` so they can
//! run inside a transaction as well.

mod feedback_ops;
mod step_ops;
mod thread_ops;
mod turn_ops;

use std::path::Path;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{User, format_timestamp};

// ─────────────────────────────────────────────────────────────────────────────
// Schema Version
// ─────────────────────────────────────────────────────────────────────────────

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Conversation history store backed by SQLite.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!(path = %path.display(), "store opened");
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.initialize()?;
        debug!("in-memory store created");
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        create_schema(&conn)
    }

    /// Cheap liveness check.
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    /// Return the user with `identifier`, creating it on first sight.
    pub fn ensure_user(&self, identifier: &str) -> Result<User> {
        let conn = self.conn.lock();
        ensure_user_in(&conn, identifier)
    }

    // ─── Cleanup ────────────────────────────────────────────────────────────

    /// Delete threads nobody owns that are older than `max_age`, plus any
    /// thread without a creation time. Steps and feedbacks go with them.
    ///
    /// Returns the number of threads deleted.
    pub fn cleanup_orphaned_threads(&self, max_age: Duration) -> Result<usize> {
        let max_age = TimeDelta::from_std(max_age)
            .map_err(|e| StoreError::InvalidData(format!("max age out of range: {e}")))?;
        let cutoff = format_timestamp(Utc::now() - max_age);

        let conn = self.conn.lock();
        let deleted = conn.execute(
            r#"
            DELETE FROM threads
            WHERE (user_identifier IS NULL AND created_at < ?1)
               OR created_at IS NULL
            "#,
            params![cutoff],
        )?;

        info!(deleted, %cutoff, "cleaned up orphaned threads");
        Ok(deleted)
    }
}

fn create_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current_version >= SCHEMA_VERSION {
        debug!(version = current_version, "schema up to date");
        return Ok(());
    }

    info!(
        from = current_version,
        to = SCHEMA_VERSION,
        "migrating store schema"
    );

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            identifier TEXT NOT NULL UNIQUE,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT
        );

        CREATE TABLE IF NOT EXISTS threads (
            id TEXT PRIMARY KEY,
            created_at TEXT,
            name TEXT,
            user_id TEXT REFERENCES users(id) ON DELETE CASCADE,
            user_identifier TEXT,
            tags TEXT,
            metadata TEXT
        );

        CREATE TABLE IF NOT EXISTS steps (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
            parent_id TEXT,
            streaming INTEGER NOT NULL DEFAULT 0,
            is_error INTEGER,
            metadata TEXT,
            input TEXT,
            output TEXT,
            created_at TEXT
        );

        CREATE TABLE IF NOT EXISTS feedbacks (
            id TEXT PRIMARY KEY,
            for_id TEXT NOT NULL,
            thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
            value INTEGER NOT NULL,
            comment TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_threads_created ON threads(created_at);
        CREATE INDEX IF NOT EXISTS idx_steps_thread ON steps(thread_id);
        CREATE INDEX IF NOT EXISTS idx_feedbacks_thread ON feedbacks(thread_id);
        "#,
    )?;

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

pub(crate) fn ensure_user_in(conn: &Connection, identifier: &str) -> Result<User> {
    conn.execute(
        "INSERT OR IGNORE INTO users (id, identifier, metadata, created_at) VALUES (?1, ?2, '{}', ?3)",
        params![
            Uuid::new_v4().to_string(),
            identifier,
            format_timestamp(Utc::now())
        ],
    )?;

    conn.query_row(
        "SELECT id, identifier, metadata, created_at FROM users WHERE identifier = ?1",
        params![identifier],
        |row| {
            Ok(User {
                id: uuid_col(row, 0)?,
                identifier: row.get(1)?,
                metadata: json_col(row, 2)?.unwrap_or(Value::Null),
                created_at: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("User {identifier}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Column helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn json_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
