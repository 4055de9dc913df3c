//! Records kept by the store.
//!
//! Serialized field names match the public API (`createdAt`,
//! `userIdentifier`, `isError`, `forId`).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Format a timestamp the way every `created_at` column stores it.
///
/// Fixed-width UTC so that lexical comparison in SQL matches time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub identifier: String,
    pub metadata: Value,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub user_identifier: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Value>,
}

/// Parameters for a new thread.
#[derive(Debug, Clone)]
pub struct NewThread {
    pub id: Uuid,
    pub name: Option<String>,
    pub user_identifier: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl NewThread {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            user_identifier: None,
            tags: Vec::new(),
            metadata: Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_user(mut self, identifier: impl Into<String>) -> Self {
        self.user_identifier = Some(identifier.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }
}

impl Default for NewThread {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of a step. Stored as its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    UserMessage,
    AssistantMessage,
    Tool,
    Run,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::UserMessage => "user_message",
            StepType::AssistantMessage => "assistant_message",
            StepType::Tool => "tool",
            StepType::Run => "run",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user_message" => Some(StepType::UserMessage),
            "assistant_message" => Some(StepType::AssistantMessage),
            "tool" => Some(StepType::Tool),
            "run" => Some(StepType::Run),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub input: Option<String>,
    pub output: Option<String>,
    pub created_at: Option<String>,
    pub is_error: Option<bool>,
    pub metadata: Option<Value>,
}

/// Parameters for a new step.
#[derive(Debug, Clone)]
pub struct NewStep {
    pub thread_id: Uuid,
    pub name: String,
    pub step_type: StepType,
    pub input: Option<String>,
    pub output: Option<String>,
    pub is_error: bool,
    pub streaming: bool,
    pub metadata: Value,
}

impl NewStep {
    pub fn new(thread_id: Uuid, name: impl Into<String>, step_type: StepType) -> Self {
        Self {
            thread_id,
            name: name.into(),
            step_type,
            input: None,
            output: None,
            is_error: false,
            streaming: false,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn failed(mut self) -> Self {
        self.is_error = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub for_id: Uuid,
    pub thread_id: Uuid,
    pub value: i64,
    pub comment: Option<String>,
}

/// One completed chat turn, as handed to [`crate::Store::record_turn`].
#[derive(Debug, Clone)]
pub struct TurnRecord {
    /// Thread to append to; created with this id if it does not exist.
    pub thread_id: Option<Uuid>,
    pub user_identifier: Option<String>,
    pub user_input: String,
    /// Retrieved news, when the turn ran a retrieval.
    pub news: Option<Value>,
    pub output: String,
    pub model: String,
    pub streaming: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2025, 2, 20, 9, 5, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 2, 20, 21, 58, 59).unwrap();
        let (fa, fb) = (format_timestamp(a), format_timestamp(b));
        assert_eq!(fa, "2025-02-20T09:05:00.000000Z");
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
    }

    #[test]
    fn test_step_type_names() {
        for t in [
            StepType::UserMessage,
            StepType::AssistantMessage,
            StepType::Tool,
            StepType::Run,
        ] {
            assert_eq!(StepType::parse(t.as_str()), Some(t));
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
        assert_eq!(StepType::parse("element"), None);
    }

    #[test]
    fn test_thread_wire_names() {
        let thread = Thread {
            id: Uuid::nil(),
            name: Some("hello".into()),
            created_at: Some("2025-01-01T00:00:00.000000Z".into()),
            user_identifier: None,
            tags: None,
            metadata: Some(json!({})),
        };
        let json = serde_json::to_value(&thread).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("userIdentifier").is_some());
    }

    #[test]
    fn test_step_wire_names() {
        let step = Step {
            id: Uuid::nil(),
            thread_id: Uuid::nil(),
            name: "admin".into(),
            step_type: StepType::UserMessage,
            input: Some("hi".into()),
            output: None,
            created_at: None,
            is_error: Some(false),
            metadata: None,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "user_message");
        assert_eq!(json["isError"], false);
        assert!(json.get("threadId").is_some());
    }
}
