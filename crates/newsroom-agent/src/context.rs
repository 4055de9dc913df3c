//! Per-turn cancellation and deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};

/// Carries the caller's cancellation token and optional deadline through a
/// turn. Every suspension point in the agent races against both.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl TurnContext {
    /// A context that never cancels and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the turn is already over.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(AgentError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run `fut` unless the turn is cancelled or its deadline passes first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            _ = deadline => Err(AgentError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_through() {
        let ctx = TurnContext::new();
        assert_eq!(ctx.guard(async { 7 }).await.unwrap(), 7);
        assert!(ctx.check().is_ok());
    }

    #[tokio::test]
    async fn test_guard_cancelled() {
        let token = CancellationToken::new();
        let ctx = TurnContext::new().with_cancel(token.clone());
        token.cancel();
        let result = ctx.guard(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert!(matches!(ctx.check(), Err(AgentError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_deadline() {
        let ctx = TurnContext::new().with_timeout(Duration::from_secs(5));
        let result = ctx
            .guard(tokio::time::sleep(Duration::from_secs(60)))
            .await;
        assert!(matches!(result, Err(AgentError::DeadlineExceeded)));
        assert!(matches!(ctx.check(), Err(AgentError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_finishes_before_deadline() {
        let ctx = TurnContext::new().with_timeout(Duration::from_secs(5));
        let result = ctx
            .guard(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                "done"
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }
}
