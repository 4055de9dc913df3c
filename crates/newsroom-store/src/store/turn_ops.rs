//! Recording a finished chat turn.

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{NewStep, NewThread, StepType, TurnRecord};

use super::Store;
use super::step_ops::insert_step_in;
use super::thread_ops::{get_thread_in, insert_thread_in};

/// Longest thread name derived from a user message, in characters.
const THREAD_NAME_MAX_CHARS: usize = 100;

/// Step name for the tool step written when a turn retrieved news.
const RETRIEVAL_STEP_NAME: &str = "news_retriever";

impl Store {
    /// Persist one turn atomically and return the thread it landed in.
    ///
    /// The thread is created on first use, named after the user input.
    /// Steps written: the user input, the retrieved news (if any), and the
    /// assistant output.
    pub fn record_turn(&self, turn: &TurnRecord) -> Result<Uuid> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let thread_id = turn.thread_id.unwrap_or_else(Uuid::new_v4);
        if get_thread_in(&tx, thread_id)?.is_none() {
            let mut thread = NewThread::new()
                .with_id(thread_id)
                .with_name(thread_name(&turn.user_input))
                .with_metadata(json!({"model": turn.model}));
            thread.user_identifier = turn.user_identifier.clone();
            insert_thread_in(&tx, &thread)?;
        }

        let author = turn.user_identifier.as_deref().unwrap_or("user");
        insert_step_in(
            &tx,
            &NewStep::new(thread_id, author, StepType::UserMessage).with_input(&turn.user_input),
        )?;

        if let Some(news) = &turn.news {
            insert_step_in(
                &tx,
                &NewStep::new(thread_id, RETRIEVAL_STEP_NAME, StepType::Tool)
                    .with_metadata(json!({ "news": news })),
            )?;
        }

        insert_step_in(
            &tx,
            &NewStep::new(thread_id, &turn.model, StepType::AssistantMessage)
                .with_output(&turn.output)
                .streaming(turn.streaming),
        )?;

        tx.commit()?;
        debug!(%thread_id, retrieval = turn.news.is_some(), "recorded turn");
        Ok(thread_id)
    }
}

fn thread_name(input: &str) -> String {
    input.trim().chars().take(THREAD_NAME_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn turn(thread_id: Option<Uuid>, news: Option<serde_json::Value>) -> TurnRecord {
        TurnRecord {
            thread_id,
            user_identifier: Some("admin".to_string()),
            user_input: "How is Nvidia doing?".to_string(),
            news,
            output: "Shares are up.".to_string(),
            model: "gpt-4o".to_string(),
            streaming: false,
        }
    }

    #[test]
    fn test_record_turn_creates_thread_and_steps() {
        let store = Store::open_in_memory().unwrap();
        let news = json!([{"title": "t", "link": "https://x"}]);

        let thread_id = store.record_turn(&turn(None, Some(news.clone()))).unwrap();

        let thread = store.get_thread(thread_id).unwrap().unwrap();
        assert_eq!(thread.name.as_deref(), Some("How is Nvidia doing?"));
        assert_eq!(thread.user_identifier.as_deref(), Some("admin"));

        let steps = store.list_steps(thread_id).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].step_type, StepType::UserMessage);
        assert_eq!(steps[0].name, "admin");
        assert_eq!(steps[0].input.as_deref(), Some("How is Nvidia doing?"));
        assert_eq!(steps[1].step_type, StepType::Tool);
        assert_eq!(steps[1].metadata, Some(json!({"news": news})));
        assert_eq!(steps[2].name, "gpt-4o");
        assert_eq!(steps[2].output.as_deref(), Some("Shares are up."));
    }

    #[test]
    fn test_record_turn_appends_to_existing_thread() {
        let store = Store::open_in_memory().unwrap();
        let thread_id = store.record_turn(&turn(None, None)).unwrap();
        let again = store.record_turn(&turn(Some(thread_id), None)).unwrap();

        assert_eq!(again, thread_id);
        assert_eq!(store.list_threads(0, 10).unwrap().len(), 1);
        assert_eq!(store.list_steps(thread_id).unwrap().len(), 4);
    }

    #[test]
    fn test_record_turn_with_caller_chosen_id() {
        let store = Store::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        assert_eq!(store.record_turn(&turn(Some(id), None)).unwrap(), id);
        assert!(store.get_thread(id).unwrap().is_some());
    }

    #[test]
    fn test_thread_name_truncates() {
        let long = "x".repeat(250);
        assert_eq!(thread_name(&long).chars().count(), THREAD_NAME_MAX_CHARS);
        assert_eq!(thread_name("  hi  "), "hi");
    }
}
