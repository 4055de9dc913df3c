//! Conversation state threaded through the agent graph.
//!
//! Each graph step produces a [`StateUpdate`]; the graph folds it into the
//! running [`ConversationState`] with [`ConversationState::apply`]. Messages
//! concatenate and metadata merges shallowly with the newer value winning.

use newsroom_llm::{ContentBlock, Message};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::retrieval::NewsItem;

/// Metadata key holding the most recent retrieval result set.
pub const NEWS_KEY: &str = "news";

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum AgentMessage {
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl AgentMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::User { content } | Self::Assistant { content, .. } | Self::Tool { content, .. } => {
                content
            }
        }
    }

    /// Tool calls carried by an assistant message; empty otherwise.
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Convert to the provider-neutral LLM message shape.
    pub fn to_llm_message(&self) -> Message {
        match self {
            Self::User { content } => Message::user(content.clone()),
            Self::Assistant {
                content,
                tool_calls,
            } if tool_calls.is_empty() => Message::assistant(content.clone()),
            Self::Assistant {
                content,
                tool_calls,
            } => {
                let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
                if !content.is_empty() {
                    blocks.push(ContentBlock::text(content.clone()));
                }
                blocks.extend(tool_calls.iter().map(|c| {
                    ContentBlock::tool_use(c.call_id.clone(), c.name.clone(), c.arguments.clone())
                }));
                Message::assistant_blocks(blocks)
            }
            Self::Tool {
                call_id, content, ..
            } => Message::tool_result(call_id.clone(), content.clone()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Concatenate two message sequences, `right` after `left`.
pub fn merge_messages(mut left: Vec<AgentMessage>, right: Vec<AgentMessage>) -> Vec<AgentMessage> {
    left.extend(right);
    left
}

/// Shallow union of two metadata maps; `right` wins on collisions.
pub fn merge_metadata(mut left: Map<String, Value>, right: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in right {
        left.insert(key, value);
    }
    left
}

/// The partial state produced by one graph step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: Vec<AgentMessage>,
    pub metadata: Map<String, Value>,
    /// Drop the most recent message before appending.
    pub pop_last: bool,
}

impl StateUpdate {
    pub fn message(message: AgentMessage) -> Self {
        Self {
            messages: vec![message],
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn replacing_last(mut self) -> Self {
        self.pop_last = true;
        self
    }
}

/// Message history plus side-channel metadata for one agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ConversationState {
    pub fn new(messages: Vec<AgentMessage>) -> Self {
        Self {
            messages,
            metadata: Map::new(),
        }
    }

    /// Fold a step's output into this state.
    pub fn apply(&mut self, update: StateUpdate) {
        if update.pop_last {
            self.messages.pop();
        }
        let messages = std::mem::take(&mut self.messages);
        self.messages = merge_messages(messages, update.messages);
        let metadata = std::mem::take(&mut self.metadata);
        self.metadata = merge_metadata(metadata, update.metadata);
    }

    /// Combine two states as a graph join would.
    pub fn merge(self, other: ConversationState) -> ConversationState {
        ConversationState {
            messages: merge_messages(self.messages, other.messages),
            metadata: merge_metadata(self.metadata, other.metadata),
        }
    }

    pub fn last(&self) -> Option<&AgentMessage> {
        self.messages.last()
    }

    /// Content of the final assistant message, if the last message is one.
    pub fn final_answer(&self) -> Option<&str> {
        match self.last() {
            Some(AgentMessage::Assistant { content, .. }) => Some(content),
            _ => None,
        }
    }

    /// News retrieved during the run, decoded from metadata.
    pub fn news(&self) -> Option<Vec<NewsItem>> {
        let value = self.metadata.get(NEWS_KEY)?;
        match serde_json::from_value(value.clone()) {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed news metadata");
                None
            }
        }
    }

    pub fn to_llm_messages(&self) -> Vec<Message> {
        self.messages.iter().map(AgentMessage::to_llm_message).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsroom_llm::Role;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_merge_messages_concatenates() {
        let merged = merge_messages(
            vec![AgentMessage::user("a")],
            vec![AgentMessage::assistant("b"), AgentMessage::user("c")],
        );
        let contents: Vec<&str> = merged.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_metadata_right_wins() {
        let merged = merge_metadata(
            map(json!({"news": [1], "keep": true})),
            map(json!({"news": [2], "extra": "x"})),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"news": [2], "keep": true, "extra": "x"})
        );
    }

    #[test]
    fn test_state_merge() {
        let left = ConversationState {
            messages: vec![AgentMessage::user("hi")],
            metadata: map(json!({"a": 1})),
        };
        let right = ConversationState {
            messages: vec![AgentMessage::assistant("hello")],
            metadata: map(json!({"a": 2})),
        };
        let merged = left.merge(right);
        assert_eq!(merged.messages.len(), 2);
        assert_eq!(merged.metadata["a"], 2);
    }

    #[test]
    fn test_apply_replacing_last() {
        let mut state = ConversationState::new(vec![
            AgentMessage::user("hi"),
            AgentMessage::assistant_with_calls(
                "",
                vec![ToolCallRequest::new("c1", "respond_directly", json!({"query": "Hello"}))],
            ),
        ]);
        state.apply(StateUpdate::message(AgentMessage::assistant("Hello")).replacing_last());
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.final_answer(), Some("Hello"));
        assert!(state.messages.iter().all(|m| m.tool_calls().is_empty()));
    }

    #[test]
    fn test_message_serde_is_role_tagged() {
        let msg = AgentMessage::tool("c1", "news_retriever", "[]");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["call_id"], "c1");

        let back: AgentMessage =
            serde_json::from_value(json!({"role": "assistant", "content": "x"})).unwrap();
        assert_eq!(back, AgentMessage::assistant("x"));
    }

    #[test]
    fn test_to_llm_messages() {
        let state = ConversationState::new(vec![
            AgentMessage::user("tesla?"),
            AgentMessage::assistant_with_calls(
                "",
                vec![ToolCallRequest::new("c1", "news_retriever", json!({"query": "tesla"}))],
            ),
            AgentMessage::tool("c1", "news_retriever", "[]"),
            AgentMessage::assistant("nothing new"),
        ]);
        let messages = state.to_llm_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(
            messages[1].content.blocks(),
            vec![ContentBlock::tool_use("c1", "news_retriever", json!({"query": "tesla"}))]
        );
        assert_eq!(
            messages[2].content.blocks(),
            vec![ContentBlock::tool_result("c1", "[]")]
        );
        assert_eq!(messages[3].content.as_text(), Some("nothing new"));
    }

    #[test]
    fn test_news_decoding() {
        let mut state = ConversationState::default();
        assert!(state.news().is_none());

        state.apply(StateUpdate::default().with_metadata(
            NEWS_KEY,
            json!([{
                "title": "t", "description": "d", "content": null,
                "link": "https://l", "query": "q", "source": "financial"
            }]),
        ));
        let news = state.news().unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].link, "https://l");

        state.apply(StateUpdate::default().with_metadata(NEWS_KEY, json!("garbage")));
        assert!(state.news().is_none());
    }
}
