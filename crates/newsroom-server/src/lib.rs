//! HTTP API server for newsroom.
//!
//! This crate exposes the news agent over HTTP.
//!
//! # Features
//!
//! - `POST /api/chat` with JSON or NDJSON streaming replies
//! - Read access to recorded threads, steps and feedback
//! - HTTP Basic authentication
//! - Hourly sweep of orphaned threads
//!
//! # Example
//!
//! ```ignore
//! use newsroom_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::new("admin", "secret")
//!     .with_bind_address("127.0.0.1:8000".parse()?);
//!
//! let server = Server::new(catalog, config).with_store(store);
//! server.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

pub mod auth;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use auth::{AuthError, Identity, auth_middleware};
pub use cleanup::{run_cleanup, spawn_cleanup_task};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use routes::{ChatMessage, ChatRequest, ChatResponse};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use newsroom_agent::AgentCatalog;
use newsroom_store::Store;

/// The newsroom HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server with the given agents and configuration.
    pub fn new(agents: AgentCatalog, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(agents, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Record chat turns and serve history from `store`.
    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.state = self.state.with_store(store);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api", self.api_routes())
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// `/api` routes. Everything but health sits behind Basic auth.
    fn api_routes(&self) -> Router<AppState> {
        use axum::routing::{get, post};

        Router::new()
            .route("/chat", post(routes::chat_handler))
            .route("/threads", get(routes::list_threads_handler))
            .route("/threads/{id}", get(routes::get_thread_handler))
            .route("/threads/{id}/steps", get(routes::list_steps_handler))
            .route("/threads/{id}/feedbacks", get(routes::list_feedbacks_handler))
            .route("/steps/{id}", get(routes::get_step_handler))
            .route("/feedbacks/{id}", get(routes::get_feedback_handler))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::auth_middleware,
            ))
            // Added after the auth layer, so not covered by it.
            .route("/health", get(routes::health))
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr, shutdown).await
    }

    /// Bind `addr` and serve until `shutdown` resolves.
    pub async fn run_on(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// Starts the cleanup task when a store is attached. On shutdown every
    /// in-flight turn is cancelled and the cleanup task is awaited.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let cleanup = self.spawn_cleanup();
        let token = self.state.shutdown.clone();
        let router = self.router();

        if let Ok(addr) = listener.local_addr() {
            info!("Starting server on {}", addr);
        }

        let signal_token = token.clone();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutting down");
                signal_token.cancel();
            })
            .await;

        token.cancel();
        if let Some(handle) = cleanup
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "cleanup task panicked");
        }

        result.map_err(|e| ServerError::Internal(format!("Server error: {}", e)))
    }

    fn spawn_cleanup(&self) -> Option<tokio::task::JoinHandle<()>> {
        let store = self.state.store.clone()?;
        let config = &self.state.config;
        if !config.cleanup_enabled {
            return None;
        }
        Some(spawn_cleanup_task(
            store,
            config.cleanup_interval,
            config.orphan_max_age,
            self.state.shutdown.clone(),
        ))
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
