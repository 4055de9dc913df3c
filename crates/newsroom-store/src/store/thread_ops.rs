//! Thread operations.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{NewThread, Thread, format_timestamp};

use super::{Store, ensure_user_in, json_col, uuid_col};

const THREAD_COLUMNS: &str = "id, name, created_at, user_identifier, tags, metadata";

impl Store {
    /// Insert a thread. Its owner, if any, is created as a user too.
    pub fn create_thread(&self, thread: &NewThread) -> Result<Thread> {
        let conn = self.conn.lock();
        insert_thread_in(&conn, thread)?;
        get_thread_in(&conn, thread.id)?
            .ok_or_else(|| crate::StoreError::NotFound(format!("Thread {}", thread.id)))
    }

    /// Get a thread by ID.
    pub fn get_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        let conn = self.conn.lock();
        get_thread_in(&conn, id)
    }

    /// List threads, newest first.
    pub fn list_threads(&self, skip: usize, limit: usize) -> Result<Vec<Thread>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let threads = stmt
            .query_map(params![limit as i64, skip as i64], row_to_thread)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(threads)
    }
}

pub(crate) fn insert_thread_in(conn: &Connection, thread: &NewThread) -> Result<()> {
    let user_id = match &thread.user_identifier {
        Some(identifier) => Some(ensure_user_in(conn, identifier)?.id.to_string()),
        None => None,
    };

    conn.execute(
        r#"
        INSERT INTO threads (id, created_at, name, user_id, user_identifier, tags, metadata)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            thread.id.to_string(),
            format_timestamp(thread.created_at),
            thread.name,
            user_id,
            thread.user_identifier,
            serde_json::to_string(&thread.tags)?,
            serde_json::to_string(&thread.metadata)?,
        ],
    )?;

    debug!(thread_id = %thread.id, "inserted thread");
    Ok(())
}

pub(crate) fn get_thread_in(conn: &Connection, id: Uuid) -> Result<Option<Thread>> {
    let thread = conn
        .query_row(
            &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
            params![id.to_string()],
            row_to_thread,
        )
        .optional()?;
    Ok(thread)
}

fn row_to_thread(row: &Row<'_>) -> rusqlite::Result<Thread> {
    let tags = json_col(row, 4)?
        .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok());
    Ok(Thread {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        user_identifier: row.get(3)?,
        tags,
        metadata: json_col(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use crate::types::NewThread;
    use chrono::{TimeDelta, Utc};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_create_and_get_thread() {
        let store = Store::open_in_memory().unwrap();
        let created = store
            .create_thread(
                &NewThread::new()
                    .with_name("Nvidia earnings")
                    .with_user("admin")
                    .with_tag("finance")
                    .with_metadata(json!({"model": "gpt-4o"})),
            )
            .unwrap();

        let fetched = store.get_thread(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.user_identifier.as_deref(), Some("admin"));
        assert_eq!(fetched.tags, Some(vec!["finance".to_string()]));
        assert_eq!(fetched.metadata, Some(json!({"model": "gpt-4o"})));
    }

    #[test]
    fn test_get_missing_thread() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_thread(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_threads_paginates_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        for i in 0..5 {
            store
                .create_thread(
                    &NewThread::new()
                        .with_name(format!("t{i}"))
                        .with_created_at(now - TimeDelta::minutes(10 - i)),
                )
                .unwrap();
        }

        let page: Vec<String> = store
            .list_threads(0, 2)
            .unwrap()
            .into_iter()
            .filter_map(|t| t.name)
            .collect();
        assert_eq!(page, vec!["t4", "t3"]);

        let rest = store.list_threads(2, 10).unwrap();
        assert_eq!(rest.len(), 3);
        assert!(store.list_threads(10, 10).unwrap().is_empty());
    }
}
