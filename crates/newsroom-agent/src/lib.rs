//! News analyst agent core.
//!
//! This crate turns a chat history into an answer grounded in fresh news:
//!
//! - [`retrieval`]: adapters over a general news search and a financial news
//!   search, both producing [`NewsItem`]s
//! - [`retry`]: exponential backoff that fails open
//! - [`aggregator`]: concurrent fan-out over one query and its entities,
//!   deduplicated by link
//! - [`state`]: the conversation state threaded through the graph
//! - [`graph`]: the agent state machine and its run/stream surfaces
//!
//! # Example
//!
//! ```rust,ignore
//! use newsroom_agent::{AgentMessage, NewsAgent, TurnContext};
//!
//! let agent = NewsAgent::builder()
//!     .with_shared_backend(backend)
//!     .with_aggregator(aggregator)
//!     .build()?;
//!
//! let state = agent.run(vec![AgentMessage::user("How is Nvidia doing?")], &TurnContext::new()).await?;
//! println!("{}", state.final_answer().unwrap_or_default());
//! ```

pub mod aggregator;
pub mod catalog;
pub mod context;
pub mod error;
pub mod graph;
pub mod prompts;
pub mod retrieval;
pub mod retry;
pub mod state;
pub mod stream;
pub mod tools;

pub use aggregator::{Aggregator, DEFAULT_MAX_WORKERS, dedup_by_link};
pub use catalog::AgentCatalog;
pub use context::TurnContext;
pub use error::{AgentError, Result};
pub use graph::{AgentBuilder, AgentConfig, GraphState, NewsAgent, route_after_agent};
pub use retrieval::{
    FinancialNewsAdapter, GeneralSearchAdapter, NewsDigest, NewsItem, NewsSource,
    RetrievalAdapter, RetrievalConfig, RetrievalError,
};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use state::{AgentMessage, ConversationState, StateUpdate, ToolCallRequest};
pub use stream::{AgentStream, StreamChunk};
pub use tools::{NEWS_RETRIEVER, RESPOND_DIRECTLY, RetrieverArgs};
