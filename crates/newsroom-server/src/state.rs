//! Application state shared across handlers.

use std::sync::Arc;

use newsroom_agent::AgentCatalog;
use newsroom_store::Store;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Application state shared across all handlers.
///
/// Cheap to clone; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// One agent per available model.
    pub agents: Arc<AgentCatalog>,

    /// Conversation history, when persistence is enabled.
    pub store: Option<Arc<Store>>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Cancelled on shutdown; every chat turn and the cleanup task hang off it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new application state without persistence.
    pub fn new(agents: AgentCatalog, config: ServerConfig) -> Self {
        Self {
            agents: Arc::new(agents),
            store: None,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach a conversation store.
    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run a blocking store operation off the async runtime.
    pub async fn with_store_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> newsroom_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone().ok_or_else(|| {
            ServerError::ServiceUnavailable("conversation storage is not configured".to_string())
        })?;
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ServerError::Internal(format!("storage task failed: {e}")))?
            .map_err(ServerError::from)
    }
}
