//! Feedback operations.

use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::Result;
use crate::types::Feedback;

use super::{Store, uuid_col};

const FEEDBACK_COLUMNS: &str = "id, for_id, thread_id, value, comment";

impl Store {
    /// Record a rating for the step `for_id` of `thread_id`.
    pub fn add_feedback(
        &self,
        thread_id: Uuid,
        for_id: Uuid,
        value: i64,
        comment: Option<&str>,
    ) -> Result<Feedback> {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            for_id,
            thread_id,
            value,
            comment: comment.map(str::to_string),
        };

        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT INTO feedbacks ({FEEDBACK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                feedback.id.to_string(),
                feedback.for_id.to_string(),
                feedback.thread_id.to_string(),
                feedback.value,
                feedback.comment,
            ],
        )?;
        Ok(feedback)
    }

    pub fn list_feedbacks(&self, thread_id: Uuid) -> Result<Vec<Feedback>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedbacks WHERE thread_id = ?1 ORDER BY rowid"
        ))?;
        let feedbacks = stmt
            .query_map(params![thread_id.to_string()], row_to_feedback)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(feedbacks)
    }

    pub fn get_feedback(&self, id: Uuid) -> Result<Option<Feedback>> {
        let conn = self.conn.lock();
        let feedback = conn
            .query_row(
                &format!("SELECT {FEEDBACK_COLUMNS} FROM feedbacks WHERE id = ?1"),
                params![id.to_string()],
                row_to_feedback,
            )
            .optional()?;
        Ok(feedback)
    }
}

fn row_to_feedback(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: uuid_col(row, 0)?,
        for_id: uuid_col(row, 1)?,
        thread_id: uuid_col(row, 2)?,
        value: row.get(3)?,
        comment: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use crate::types::NewThread;
    use uuid::Uuid;

    #[test]
    fn test_feedback_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let thread = store.create_thread(&NewThread::new()).unwrap();
        let step_id = Uuid::new_v4();

        let up = store.add_feedback(thread.id, step_id, 1, Some("useful")).unwrap();
        let down = store.add_feedback(thread.id, step_id, 0, None).unwrap();

        assert_eq!(store.list_feedbacks(thread.id).unwrap(), vec![up.clone(), down]);
        assert_eq!(store.get_feedback(up.id).unwrap(), Some(up));
        assert!(store.get_feedback(Uuid::new_v4()).unwrap().is_none());
        assert!(store.list_feedbacks(Uuid::new_v4()).unwrap().is_empty());
    }
}
