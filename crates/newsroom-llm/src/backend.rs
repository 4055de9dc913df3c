//! LLM Backend trait and implementations.
//!
//! This module defines the abstraction layer over model providers and
//! provides a mock implementation for testing.

use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse, ContentBlock, StopReason, Usage};

// ─────────────────────────────────────────────────────────────────────────────
// Streaming Types
// ─────────────────────────────────────────────────────────────────────────────

/// A streaming response from an LLM backend.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send + 'static>>;

/// Events emitted during streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Message started.
    MessageStart { id: String, model: String },
    /// Content block started.
    ContentBlockStart { index: usize, block: BlockStart },
    /// Delta within a content block.
    ContentBlockDelta { index: usize, delta: ContentDelta },
    /// Content block finished.
    ContentBlockStop { index: usize },
    /// Message finished with final usage stats.
    MessageDelta {
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Message complete.
    MessageStop,
    /// Ping to keep connection alive.
    Ping,
    /// Error occurred.
    Error { message: String },
}

/// The kind of content block being opened in a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockStart {
    /// A text block.
    Text,
    /// A tool call; arguments follow as [`ContentDelta::InputJsonDelta`].
    ToolUse { id: String, name: String },
}

/// Delta content in a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentDelta {
    /// Text being streamed.
    TextDelta(String),
    /// Partial JSON for tool input.
    InputJsonDelta(String),
}

impl StreamEvent {
    /// Returns true if this is the final event in a message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::MessageStop | StreamEvent::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream Accumulation
// ─────────────────────────────────────────────────────────────────────────────

/// Folds stream events back into a complete [`CompletionResponse`].
///
/// Text deltas are concatenated in arrival order; tool calls are assembled
/// from their start event plus the JSON fragments that follow, ordered by
/// block index.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    id: String,
    model: String,
    text: String,
    tools: BTreeMap<usize, PendingToolUse>,
    stop_reason: Option<StopReason>,
    usage: Usage,
}

#[derive(Debug, Default)]
struct PendingToolUse {
    id: String,
    name: String,
    arguments: String,
}

impl StreamAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns the text fragment if the event carried one.
    pub fn apply(&mut self, event: &StreamEvent) -> Result<Option<String>> {
        match event {
            StreamEvent::MessageStart { id, model } => {
                self.id = id.clone();
                self.model = model.clone();
            }
            StreamEvent::ContentBlockStart {
                index,
                block: BlockStart::ToolUse { id, name },
            } => {
                let entry = self.tools.entry(*index).or_default();
                entry.id = id.clone();
                entry.name = name.clone();
            }
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                ContentDelta::TextDelta(text) => {
                    self.text.push_str(text);
                    return Ok(Some(text.clone()));
                }
                ContentDelta::InputJsonDelta(json) => {
                    self.tools.entry(*index).or_default().arguments.push_str(json);
                }
            },
            StreamEvent::MessageDelta { stop_reason, usage } => {
                self.stop_reason = Some(*stop_reason);
                self.usage = usage.clone();
            }
            StreamEvent::Error { message } => {
                return Err(LlmError::Backend(message.clone()));
            }
            StreamEvent::ContentBlockStart { .. }
            | StreamEvent::ContentBlockStop { .. }
            | StreamEvent::MessageStop
            | StreamEvent::Ping => {}
        }
        Ok(None)
    }

    /// Build the final response.
    pub fn finish(self) -> CompletionResponse {
        let mut content = Vec::new();
        if !self.text.is_empty() {
            content.push(ContentBlock::text(self.text));
        }

        let has_tools = !self.tools.is_empty();
        for (_, tool) in self.tools {
            let input = if tool.arguments.trim().is_empty() {
                serde_json::Value::Object(Default::default())
            } else {
                // Malformed arguments surface as null, matching `complete`.
                serde_json::from_str(&tool.arguments).unwrap_or_else(|e| {
                    tracing::warn!(tool = %tool.name, error = %e, "unparseable tool arguments");
                    serde_json::Value::Null
                })
            };
            content.push(ContentBlock::tool_use(tool.id, tool.name, input));
        }

        let stop_reason = self.stop_reason.unwrap_or(if has_tools {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        });

        CompletionResponse::new(self.id, self.model, content, stop_reason, self.usage)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for LLM backend providers.
///
/// Implementations connect to a model service (OpenAI, a local Ollama
/// server, ...). Tools are always passed natively through `request.tools`
/// and come back as structured `tool_use` content blocks.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Execute a completion request and return a stream of events.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream>;

    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Check if the backend is available and properly configured.
    async fn health_check(&self) -> Result<()>;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A mock backend for testing purposes.
///
/// Returns pre-configured responses in order, useful for deterministic testing
/// of the agent graph. Once the scripted responses run out every call fails
/// with a backend error.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    responses: Mutex<Vec<CompletionResponse>>,
    request_log: Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    /// Create a new mock backend with the given responses.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses),
            request_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![CompletionResponse::new(
            "mock_msg_1",
            "mock-model",
            vec![ContentBlock::text(text)],
            StopReason::EndTurn,
            Usage::new(10, 20),
        )])
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.request_log.lock().push(request);

        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            ));
        }
        Ok(responses.remove(0))
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream> {
        let response = self.complete(request).await?;
        let events: Vec<Result<StreamEvent>> = response_to_events(response)
            .into_iter()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Replay a complete response as the event sequence a streaming provider
/// would have produced. Text is split on whitespace boundaries so consumers
/// see more than one fragment.
fn response_to_events(response: CompletionResponse) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::MessageStart {
        id: response.id.clone(),
        model: response.model.clone(),
    }];

    for (index, block) in response.content.iter().enumerate() {
        match block {
            ContentBlock::Text { text } => {
                events.push(StreamEvent::ContentBlockStart {
                    index,
                    block: BlockStart::Text,
                });
                for piece in text.split_inclusive(' ') {
                    events.push(StreamEvent::ContentBlockDelta {
                        index,
                        delta: ContentDelta::TextDelta(piece.to_string()),
                    });
                }
            }
            ContentBlock::ToolUse { id, name, input } => {
                events.push(StreamEvent::ContentBlockStart {
                    index,
                    block: BlockStart::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                    },
                });
                events.push(StreamEvent::ContentBlockDelta {
                    index,
                    delta: ContentDelta::InputJsonDelta(input.to_string()),
                });
            }
            ContentBlock::ToolResult { .. } => continue,
        }
        events.push(StreamEvent::ContentBlockStop { index });
    }

    events.push(StreamEvent::MessageDelta {
        stop_reason: response.stop_reason.unwrap_or(StopReason::EndTurn),
        usage: response.usage,
    });
    events.push(StreamEvent::MessageStop);
    events
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use futures::StreamExt;

    fn tool_response() -> CompletionResponse {
        CompletionResponse::new(
            "msg_1",
            "model",
            vec![
                ContentBlock::text("Let me check."),
                ContentBlock::tool_use(
                    "call_1",
                    "news_retriever",
                    serde_json::json!({"query": "nvidia", "entities": ["nvidia"]}),
                ),
            ],
            StopReason::ToolUse,
            Usage::new(50, 30),
        )
    }

    #[tokio::test]
    async fn test_mock_backend_single_response() {
        let backend = MockBackend::with_text("Hello!");

        let request = CompletionRequest::new("test-model", vec![Message::user("Hi")], 100);
        let response = backend.complete(request).await.unwrap();

        assert_eq!(response.text(), "Hello!");
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_exhausted() {
        let backend = MockBackend::new(vec![]);

        let request = CompletionRequest::new("test-model", vec![Message::user("Hi")], 100);
        let result = backend.complete(request).await;

        assert!(matches!(result, Err(LlmError::Backend(_))));
    }

    #[tokio::test]
    async fn test_mock_backend_logs_requests() {
        let backend = MockBackend::with_text("ok");
        let request = CompletionRequest::new("m", vec![Message::user("question")], 10)
            .with_system("system");
        backend.complete(request).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("system"));
    }

    #[tokio::test]
    async fn test_mock_stream_round_trips_through_accumulator() {
        let backend = MockBackend::new(vec![tool_response()]);
        let request = CompletionRequest::new("m", vec![Message::user("nvidia?")], 100);
        let mut stream = backend.complete_stream(request).await.unwrap();

        let mut acc = StreamAccumulator::new();
        let mut fragments = Vec::new();
        while let Some(event) = stream.next().await {
            if let Some(text) = acc.apply(&event.unwrap()).unwrap() {
                fragments.push(text);
            }
        }

        assert_eq!(fragments, vec!["Let ".to_string(), "me ".into(), "check.".into()]);

        let response = acc.finish();
        assert_eq!(response.text(), "Let me check.");
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        let uses = response.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].id, "call_1");
        assert_eq!(uses[0].input["entities"][0], "nvidia");
    }

    #[test]
    fn test_accumulator_joins_split_tool_arguments() {
        let mut acc = StreamAccumulator::new();
        let events = [
            StreamEvent::ContentBlockStart {
                index: 1,
                block: BlockStart::ToolUse {
                    id: "call_9".into(),
                    name: "respond_directly".into(),
                },
            },
            StreamEvent::ContentBlockDelta {
                index: 1,
                delta: ContentDelta::InputJsonDelta(r#"{"que"#.into()),
            },
            StreamEvent::ContentBlockDelta {
                index: 1,
                delta: ContentDelta::InputJsonDelta(r#"ry":"Hi"}"#.into()),
            },
        ];
        for event in &events {
            assert!(acc.apply(event).unwrap().is_none());
        }

        let response = acc.finish();
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(response.tool_uses()[0].input["query"], "Hi");
    }

    #[test]
    fn test_accumulator_surfaces_stream_errors() {
        let mut acc = StreamAccumulator::new();
        let result = acc.apply(&StreamEvent::Error {
            message: "overloaded".into(),
        });
        assert!(matches!(result, Err(LlmError::Backend(m)) if m == "overloaded"));
    }

    #[test]
    fn test_accumulator_malformed_tool_json_becomes_null() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&StreamEvent::ContentBlockStart {
            index: 1,
            block: BlockStart::ToolUse {
                id: "call_1".into(),
                name: "news_retriever".into(),
            },
        })
        .unwrap();
        acc.apply(&StreamEvent::ContentBlockDelta {
            index: 1,
            delta: ContentDelta::InputJsonDelta("{broken".into()),
        })
        .unwrap();
        let response = acc.finish();
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert!(response.tool_uses()[0].input.is_null());
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::MessageStop.is_terminal());
        assert!(
            StreamEvent::Error {
                message: "x".into()
            }
            .is_terminal()
        );
        assert!(!StreamEvent::Ping.is_terminal());
    }
}
