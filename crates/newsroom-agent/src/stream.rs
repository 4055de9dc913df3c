//! Streaming output of an agent turn.
//!
//! A streamed turn surfaces two kinds of items: the news set found by each
//! retrieval step, and assistant text fragments as the model produces them.
//! A failure ends the stream with a single error item.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::retrieval::NewsItem;

// ─────────────────────────────────────────────────────────────────────────────
// Stream Chunk
// ─────────────────────────────────────────────────────────────────────────────

/// An item emitted while a turn is streamed.
///
/// Serialized externally tagged, so a consumer sees `{"news": [...]}`,
/// `{"chunk": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamChunk {
    /// Items returned by a retrieval step.
    News(Vec<NewsItem>),
    /// A fragment of assistant text.
    Chunk(String),
    /// The turn failed; no further items follow.
    Error(String),
}

impl StreamChunk {
    /// Create a text chunk.
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk(text.into())
    }

    /// Create an error chunk.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// A boxed stream of chunks.
pub type AgentStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send + 'static>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::NewsSource;
    use serde_json::json;

    #[test]
    fn test_chunk_wire_format() {
        let json = serde_json::to_value(StreamChunk::chunk("Hel")).unwrap();
        assert_eq!(json, json!({"chunk": "Hel"}));

        let json = serde_json::to_value(StreamChunk::error("boom")).unwrap();
        assert_eq!(json, json!({"error": "boom"}));
    }

    #[test]
    fn test_news_wire_format() {
        let chunk = StreamChunk::News(vec![NewsItem {
            title: "Chips".to_string(),
            description: "Shortage eases".to_string(),
            content: None,
            link: "https://example.com/a".to_string(),
            query: "chip shortage".to_string(),
            source: NewsSource::General,
        }]);
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["news"][0]["link"], "https://example.com/a");
        assert_eq!(json["news"][0]["source"], "general");
        assert!(json["news"][0]["content"].is_null());

        let back: StreamChunk = serde_json::from_value(json).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_is_error() {
        assert!(StreamChunk::error("x").is_error());
        assert!(!StreamChunk::chunk("x").is_error());
    }
}
