//! The agent graph: alternates model calls with retrieval until the model
//! answers.
//!
//! ```text
//!            ┌──────────────┐  retrieval call   ┌──────────┐
//!   start ──▶│    AGENT     │──────────────────▶│ RETRIEVE │
//!            │ (model call) │◀──────────────────│          │
//!            └──────────────┘                   └──────────┘
//!              │         │ respond_directly
//!   no tool    │         ▼
//!   calls      │   ┌────────────────┐
//!              │   │ RESPOND_DIRECT │
//!              ▼   └────────────────┘
//!            ┌─────┐       │
//!            │ END │◀──────┘
//!            └─────┘
//! ```
//!
//! Transitions are a pure function of the current node and the last message
//! ([`GraphState::next`]); step execution lives on [`NewsAgent`].

use futures::StreamExt;
use std::sync::Arc;

use newsroom_llm::{
    CompletionRequest, CompletionResponse, LlmBackend, ModelName, SharedBackend,
    StreamAccumulator, ToolDefinition,
};

use crate::aggregator::Aggregator;
use crate::context::TurnContext;
use crate::error::{AgentError, Result};
use crate::prompts::SYSTEM_PROMPT;
use crate::retrieval::{NewsDigest, NewsItem};
use crate::state::{AgentMessage, ConversationState, NEWS_KEY, StateUpdate, ToolCallRequest};
use crate::stream::{AgentStream, StreamChunk};
use crate::tools::{RESPOND_DIRECTLY, RetrieverArgs, direct_response, tools_for};

/// Content of the tool message answering a retrieval call that was not run.
const SKIPPED_CALL_RESULT: &str = "not executed: only one retrieval runs per turn";

// ─────────────────────────────────────────────────────────────────────────────
// Transition Function
// ─────────────────────────────────────────────────────────────────────────────

/// Nodes of the agent graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Call the model with the full history.
    Agent,
    /// Run the requested retrieval.
    Retrieve,
    /// Replace the tool-call shell with the direct answer.
    RespondDirect,
    /// Terminal.
    End,
}

impl GraphState {
    /// The node that follows `self`, given the most recent message.
    pub fn next(self, last: Option<&AgentMessage>) -> GraphState {
        match self {
            GraphState::Agent => route_after_agent(last),
            GraphState::Retrieve => GraphState::Agent,
            GraphState::RespondDirect | GraphState::End => GraphState::End,
        }
    }
}

/// Route on the tool calls of the message the model just produced.
///
/// `respond_directly` wins over retrieval when both appear in one turn.
pub fn route_after_agent(last: Option<&AgentMessage>) -> GraphState {
    let calls = last.map(AgentMessage::tool_calls).unwrap_or_default();
    if calls.is_empty() {
        GraphState::End
    } else if calls.iter().any(|c| c.name == RESPOND_DIRECTLY) {
        GraphState::RespondDirect
    } else {
        GraphState::Retrieve
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Per-agent model settings.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: ModelName,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Model calls allowed in one turn.
    pub max_iterations: u32,
    pub system_prompt: String,
}

impl AgentConfig {
    pub fn new(model: ModelName) -> Self {
        Self {
            model,
            max_tokens: 4096,
            temperature: 0.0,
            max_iterations: 8,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(ModelName::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// News Agent
// ─────────────────────────────────────────────────────────────────────────────

/// A news analyst bound to one model.
///
/// Cheap to clone; the backend and the aggregator's worker pool are shared.
#[derive(Clone)]
pub struct NewsAgent {
    backend: SharedBackend,
    aggregator: Aggregator,
    config: AgentConfig,
    tools: Arc<Vec<ToolDefinition>>,
}

impl std::fmt::Debug for NewsAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsAgent")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl NewsAgent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn model(&self) -> ModelName {
        self.config.model
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Run a turn to completion.
    ///
    /// Model errors end the turn immediately; retrieval failures only shrink
    /// the news set.
    pub async fn run(
        &self,
        messages: Vec<AgentMessage>,
        ctx: &TurnContext,
    ) -> Result<ConversationState> {
        let mut state = ConversationState::new(messages);
        let mut node = GraphState::Agent;
        let mut iterations = 0u32;

        tracing::info!(model = %self.config.model, "agent turn started");
        loop {
            match node {
                GraphState::Agent => {
                    self.count_iteration(&mut iterations)?;
                    let update = self.agent_step(&state, ctx).await?;
                    state.apply(update);
                }
                GraphState::Retrieve => {
                    let (update, _) = self.retrieve_step(&state, ctx).await?;
                    state.apply(update);
                }
                GraphState::RespondDirect => {
                    let (update, _) = respond_direct_step(&state);
                    state.apply(update);
                }
                GraphState::End => break,
            }
            node = node.next(state.last());
            tracing::debug!(?node, messages = state.messages.len(), "graph transition");
        }

        tracing::info!(model = %self.config.model, iterations, "agent turn finished");
        Ok(state)
    }

    /// Run a turn, surfacing news sets and assistant text as they appear.
    ///
    /// The stream ends after the final answer, or with one
    /// [`StreamChunk::Error`] if the turn fails.
    pub fn stream(&self, messages: Vec<AgentMessage>, ctx: TurnContext) -> AgentStream {
        let agent = self.clone();

        let chunks = async_stream::try_stream! {
            let mut state = ConversationState::new(messages);
            let mut node = GraphState::Agent;
            let mut iterations = 0u32;

            loop {
                match node {
                    GraphState::Agent => {
                        agent.count_iteration(&mut iterations)?;
                        ctx.check()?;
                        let request = agent.build_request(&state).with_streaming();
                        let mut events = ctx.guard(agent.backend.complete_stream(request)).await??;
                        let mut acc = StreamAccumulator::new();
                        while let Some(event) = ctx.guard(events.next()).await? {
                            let event = event?;
                            if let Some(text) = acc.apply(&event)? {
                                yield StreamChunk::Chunk(text);
                            }
                            if event.is_terminal() {
                                break;
                            }
                        }
                        let response = acc.finish();
                        state.apply(StateUpdate::message(message_from_response(&response)));
                    }
                    GraphState::Retrieve => {
                        let (update, items) = agent.retrieve_step(&state, &ctx).await?;
                        state.apply(update);
                        yield StreamChunk::News(items);
                    }
                    GraphState::RespondDirect => {
                        let (update, text) = respond_direct_step(&state);
                        state.apply(update);
                        yield StreamChunk::Chunk(text);
                    }
                    GraphState::End => break,
                }
                node = node.next(state.last());
            }
        };

        Box::pin(chunks.map(|item: Result<StreamChunk>| {
            item.unwrap_or_else(|e| {
                tracing::error!(error = %e, "streamed turn failed");
                StreamChunk::error(e.to_string())
            })
        }))
    }

    fn count_iteration(&self, iterations: &mut u32) -> Result<()> {
        if *iterations >= self.config.max_iterations {
            tracing::warn!(max = self.config.max_iterations, "agent hit iteration limit");
            return Err(AgentError::MaxIterations(self.config.max_iterations));
        }
        *iterations += 1;
        Ok(())
    }

    fn build_request(&self, state: &ConversationState) -> CompletionRequest {
        CompletionRequest::new(
            self.config.model.as_str(),
            state.to_llm_messages(),
            self.config.max_tokens,
        )
        .with_system(self.config.system_prompt.clone())
        .with_tools(self.tools.to_vec())
        .with_temperature(self.config.temperature)
    }

    /// AGENT: one model call, one appended assistant message.
    async fn agent_step(&self, state: &ConversationState, ctx: &TurnContext) -> Result<StateUpdate> {
        ctx.check()?;
        let request = self.build_request(state);
        let response = ctx.guard(self.backend.complete(request)).await??;
        tracing::debug!(
            tool_calls = response.tool_uses().len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "model responded"
        );
        Ok(StateUpdate::message(message_from_response(&response)))
    }

    /// RETRIEVE: run the first retrieval call of the last message.
    async fn retrieve_step(
        &self,
        state: &ConversationState,
        ctx: &TurnContext,
    ) -> Result<(StateUpdate, Vec<NewsItem>)> {
        let calls = state.last().map(AgentMessage::tool_calls).unwrap_or_default();
        let Some((call, skipped)) = calls.split_first() else {
            return Err(AgentError::internal("retrieve step without a tool call"));
        };

        let args = RetrieverArgs::from_value(&call.arguments);
        tracing::info!(query = %args.query, entities = ?args.entities, "retrieving news");
        let items = self.aggregator.aggregate(&args.query, &args.entities, ctx).await;
        ctx.check()?;

        let digest: Vec<NewsDigest> = items.iter().map(NewsDigest::from).collect();
        let mut update = StateUpdate::message(AgentMessage::tool(
            call.call_id.clone(),
            call.name.clone(),
            serde_json::to_string(&digest)?,
        ))
        .with_metadata(NEWS_KEY, serde_json::to_value(&items)?);

        for extra in skipped {
            tracing::debug!(call_id = %extra.call_id, name = %extra.name, "ignoring extra tool call");
            update.messages.push(AgentMessage::tool(
                extra.call_id.clone(),
                extra.name.clone(),
                SKIPPED_CALL_RESULT,
            ));
        }
        Ok((update, items))
    }
}

/// RESPOND_DIRECT: swap the tool-call shell for the answer it carries.
/// With several `respond_directly` calls the last one is the answer.
fn respond_direct_step(state: &ConversationState) -> (StateUpdate, String) {
    let text = state
        .last()
        .map(AgentMessage::tool_calls)
        .unwrap_or_default()
        .iter()
        .rev()
        .find(|c| c.name == RESPOND_DIRECTLY)
        .map(|c| direct_response(&c.arguments))
        .unwrap_or_default();
    let update = StateUpdate::message(AgentMessage::assistant(text.clone())).replacing_last();
    (update, text)
}

fn message_from_response(response: &CompletionResponse) -> AgentMessage {
    let calls = response
        .tool_uses()
        .into_iter()
        .map(|t| ToolCallRequest::new(t.id, t.name, t.input))
        .collect();
    AgentMessage::assistant_with_calls(response.text(), calls)
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`NewsAgent`].
pub struct AgentBuilder {
    backend: Option<SharedBackend>,
    aggregator: Option<Aggregator>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            aggregator: None,
            config: AgentConfig::default(),
        }
    }

    /// Set the LLM backend.
    pub fn with_backend(mut self, backend: impl LlmBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set a shared LLM backend.
    pub fn with_shared_backend(mut self, backend: SharedBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the retrieval aggregator.
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the model; this also decides which tools are bound.
    pub fn with_model(mut self, model: ModelName) -> Self {
        self.config.model = model;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Build the agent.
    pub fn build(self) -> Result<NewsAgent> {
        let backend = self
            .backend
            .ok_or_else(|| AgentError::config("LLM backend is required"))?;
        let aggregator = self
            .aggregator
            .ok_or_else(|| AgentError::config("retrieval aggregator is required"))?;
        let tools = Arc::new(tools_for(self.config.model));

        Ok(NewsAgent {
            backend,
            aggregator,
            config: self.config,
            tools,
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
