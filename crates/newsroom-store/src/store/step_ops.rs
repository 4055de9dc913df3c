//! Step operations.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{NewStep, Step, StepType, format_timestamp};

use super::{Store, json_col, uuid_col};

const STEP_COLUMNS: &str =
    "id, thread_id, name, type, input, output, created_at, is_error, metadata";

impl Store {
    /// Append a step to its thread.
    pub fn add_step(&self, step: &NewStep) -> Result<Step> {
        let conn = self.conn.lock();
        let id = insert_step_in(&conn, step)?;
        get_step_in(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("Step {id}")))
    }

    /// Steps of a thread in creation order.
    pub fn list_steps(&self, thread_id: Uuid) -> Result<Vec<Step>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STEP_COLUMNS} FROM steps WHERE thread_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let steps = stmt
            .query_map(params![thread_id.to_string()], row_to_step)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(steps)
    }

    /// Get a step by ID.
    pub fn get_step(&self, id: Uuid) -> Result<Option<Step>> {
        let conn = self.conn.lock();
        get_step_in(&conn, id)
    }
}

pub(crate) fn insert_step_in(conn: &Connection, step: &NewStep) -> Result<Uuid> {
    let id = Uuid::new_v4();
    conn.execute(
        r#"
        INSERT INTO steps (id, name, type, thread_id, streaming, is_error, metadata, input, output, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            id.to_string(),
            step.name,
            step.step_type.as_str(),
            step.thread_id.to_string(),
            step.streaming,
            step.is_error,
            serde_json::to_string(&step.metadata)?,
            step.input,
            step.output,
            format_timestamp(Utc::now()),
        ],
    )?;
    Ok(id)
}

fn get_step_in(conn: &Connection, id: Uuid) -> Result<Option<Step>> {
    let step = conn
        .query_row(
            &format!("SELECT {STEP_COLUMNS} FROM steps WHERE id = ?1"),
            params![id.to_string()],
            row_to_step,
        )
        .optional()?;
    Ok(step)
}

fn row_to_step(row: &Row<'_>) -> rusqlite::Result<Step> {
    let raw_type: String = row.get(3)?;
    let step_type = StepType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown step type {raw_type}").into(),
        )
    })?;
    Ok(Step {
        id: uuid_col(row, 0)?,
        thread_id: uuid_col(row, 1)?,
        name: row.get(2)?,
        step_type,
        input: row.get(4)?,
        output: row.get(5)?,
        created_at: row.get(6)?,
        is_error: row.get(7)?,
        metadata: json_col(row, 8)?,
    })
}
