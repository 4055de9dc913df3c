//! LLM client abstraction for newsroom.
//!
//! This crate provides a unified interface for the chat models the news agent
//! talks to (hosted OpenAI models and a local Ollama server), with support for
//! streaming responses and native tool calling.
//!
//! # Architecture
//!
//! The core abstraction is the [`LlmBackend`] trait which all providers implement.
//! [`LlmClient`] maps each [`ModelName`] onto the backend that serves it.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  LlmBackend trait                       │
//! │  - complete() -> Response               │
//! │  - complete_stream() -> Stream<Event>   │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!     ┌──────────┐        ┌────────┐
//!     │  OpenAI  │        │ Ollama │
//!     └──────────┘        └────────┘
//! ```

pub mod backend;
pub mod client;
pub mod error;
pub mod models;
pub mod openai;
pub mod types;

pub use backend::{
    BlockStart, ContentDelta, LlmBackend, MockBackend, ResponseStream, SharedBackend,
    StreamAccumulator, StreamEvent,
};
pub use client::{LlmClient, LlmClientConfig, Provider};
pub use error::{LlmError, RateLimitInfo, Result};
pub use models::ModelName;
pub use openai::{OpenAiBackend, OpenAiConfig, create_shared_backend};
pub use types::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, Message, Role, StopReason,
    ToolDefinition, ToolUseBlock, Usage,
};
