//! Periodic removal of orphaned threads.

use std::sync::Arc;
use std::time::Duration;

use newsroom_store::Store;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run one sweep. Returns the number of threads deleted, or `None` if the
/// sweep failed (the error is logged).
pub async fn run_cleanup(store: Arc<Store>, max_age: Duration) -> Option<usize> {
    let result =
        tokio::task::spawn_blocking(move || store.cleanup_orphaned_threads(max_age)).await;

    match result {
        Ok(Ok(deleted)) => {
            tracing::info!(deleted, "cleaned up orphaned threads");
            Some(deleted)
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "orphaned thread cleanup failed");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "orphaned thread cleanup task panicked");
            None
        }
    }
}

/// Spawn the sweeper. The first sweep runs immediately, then once per
/// `interval` until `shutdown` is cancelled.
pub fn spawn_cleanup_task(
    store: Arc<Store>,
    interval: Duration,
    max_age: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "cleanup task started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    run_cleanup(store.clone(), max_age).await;
                }
            }
        }

        tracing::info!("cleanup task stopped");
    })
}
