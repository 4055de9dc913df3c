//! Chat endpoint.
//!
//! `POST /api/chat` runs one agent turn. With `"stream": true` the reply is
//! newline-delimited JSON, one [`StreamChunk`] per line; otherwise a single
//! JSON document with the whole conversation and the retrieved news.

use std::convert::Infallible;

use axum::{
    Extension, Json,
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use newsroom_agent::state::NEWS_KEY;
use newsroom_agent::{
    AgentMessage, ConversationState, NewsAgent, NewsItem, StreamChunk, TurnContext,
};
use newsroom_llm::ModelName;
use newsroom_store::TurnRecord;

use crate::auth::Identity;
use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Content type of streamed replies.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Response header carrying the thread a turn was recorded under.
pub const THREAD_ID_HEADER: &str = "x-thread-id";

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// A message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Model to drive the turn; the catalog default when omitted.
    #[serde(default)]
    pub model: Option<ModelName>,
    #[serde(default)]
    pub stream: bool,
    /// Thread to append the turn to when history is recorded.
    #[serde(default)]
    pub thread_id: Option<Uuid>,
}

/// Non-streaming reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Every non-empty message of the finished conversation.
    pub messages: Vec<ChatMessage>,
    /// News retrieved during the turn; `null` when nothing was retrieved.
    pub news: Option<Vec<NewsItem>>,
    /// Thread the turn was recorded under, when history is enabled.
    pub thread_id: Option<Uuid>,
}

/// Convert wire messages to agent messages. Only `user` and `assistant`
/// roles are accepted; anything else is logged and dropped.
pub fn to_agent_messages(messages: Vec<ChatMessage>) -> Vec<AgentMessage> {
    messages
        .into_iter()
        .filter_map(|message| match message.role.as_str() {
            "user" => Some(AgentMessage::user(message.content)),
            "assistant" => Some(AgentMessage::assistant(message.content)),
            other => {
                tracing::warn!(role = other, "skipping message with unsupported role");
                None
            }
        })
        .collect()
}

/// Project a finished conversation onto the wire, dropping empty messages.
pub fn to_chat_messages(state: &ConversationState) -> Vec<ChatMessage> {
    state
        .messages
        .iter()
        .filter(|m| !m.content().is_empty())
        .map(|m| ChatMessage::new(m.role(), m.content()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/chat`
pub async fn chat_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<ChatRequest>,
) -> Result<Response> {
    let agent = state
        .agents
        .get(request.model)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
        .clone();

    let user_input = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let messages = to_agent_messages(request.messages);
    if messages.is_empty() {
        return Err(ServerError::BadRequest(
            "no user or assistant messages".to_string(),
        ));
    }

    let pending = PendingTurn {
        thread_id: request
            .thread_id
            .or_else(|| state.store.is_some().then(Uuid::new_v4)),
        username: identity.username,
        user_input,
        model: agent.model(),
        streaming: request.stream,
    };
    let ctx = turn_context(&state);

    tracing::info!(
        model = %pending.model,
        stream = pending.streaming,
        messages = messages.len(),
        "chat request"
    );

    if request.stream {
        return Ok(stream_response(state, agent, messages, ctx, pending));
    }

    let result = agent.run(messages, &ctx).await?;
    let output = result.final_answer().unwrap_or_default().to_string();
    let news_value = result.metadata.get(NEWS_KEY).cloned();
    let thread_id = record(&state, pending.into_record(output, news_value)).await;

    Ok(Json(ChatResponse {
        messages: to_chat_messages(&result),
        news: result.news(),
        thread_id,
    })
    .into_response())
}

/// Every turn is cancelled on shutdown and bounded by the configured timeout.
fn turn_context(state: &AppState) -> TurnContext {
    let ctx = TurnContext::new().with_cancel(state.shutdown.child_token());
    match state.config.turn_timeout {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming
// ─────────────────────────────────────────────────────────────────────────────

fn stream_response(
    state: AppState,
    agent: NewsAgent,
    messages: Vec<AgentMessage>,
    ctx: TurnContext,
    pending: PendingTurn,
) -> Response {
    let thread_id = pending.thread_id;
    let mut chunks = agent.stream(messages, ctx);

    let lines = async_stream::stream! {
        let mut output = String::new();
        let mut news = None;
        let mut failed = false;

        while let Some(chunk) = chunks.next().await {
            match &chunk {
                StreamChunk::News(items) => news = serde_json::to_value(items).ok(),
                StreamChunk::Chunk(text) => output.push_str(text),
                StreamChunk::Error(_) => failed = true,
            }
            match serde_json::to_string(&chunk) {
                Ok(mut line) => {
                    line.push('\n');
                    yield Ok::<_, Infallible>(line);
                }
                Err(e) => tracing::error!(error = %e, "failed to encode stream chunk"),
            }
        }

        if !failed {
            record(&state, pending.into_record(output, news)).await;
        }
    };

    let mut response = Body::from_stream(lines).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(NDJSON_CONTENT_TYPE));
    if let Some(id) = thread_id
        && let Ok(value) = HeaderValue::from_str(&id.to_string())
    {
        headers.insert(HeaderName::from_static(THREAD_ID_HEADER), value);
    }
    response
}

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

/// What is known about a turn before it runs.
struct PendingTurn {
    thread_id: Option<Uuid>,
    username: String,
    user_input: String,
    model: ModelName,
    streaming: bool,
}

impl PendingTurn {
    fn into_record(self, output: String, news: Option<serde_json::Value>) -> TurnRecord {
        TurnRecord {
            thread_id: self.thread_id,
            user_identifier: Some(self.username),
            user_input: self.user_input,
            news,
            output,
            model: self.model.to_string(),
            streaming: self.streaming,
        }
    }
}

/// Persist a finished turn. A failed write is logged; it never fails the
/// request.
async fn record(state: &AppState, turn: TurnRecord) -> Option<Uuid> {
    state.store.as_ref()?;
    match state
        .with_store_blocking(move |store| store.record_turn(&turn))
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!(error = %e, "failed to record chat turn");
            None
        }
    }
}
