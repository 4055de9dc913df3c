//! Parallel fan-out over the retrieval adapters.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::context::TurnContext;
use crate::retrieval::{NewsItem, RetrievalAdapter};
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Default number of retrieval tasks allowed in flight at once.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Runs one general search plus one financial search per entity, in
/// parallel, and merges the results.
///
/// Cloning is cheap; clones share the same worker pool, so one aggregator
/// can serve every conversation in the process.
#[derive(Clone)]
pub struct Aggregator {
    general: Arc<dyn RetrievalAdapter>,
    financial: Arc<dyn RetrievalAdapter>,
    workers: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl Aggregator {
    pub fn new(general: Arc<dyn RetrievalAdapter>, financial: Arc<dyn RetrievalAdapter>) -> Self {
        Self {
            general,
            financial,
            workers: Arc::new(Semaphore::new(DEFAULT_MAX_WORKERS)),
            policy: RetryPolicy::default(),
        }
    }

    /// Bound the worker pool.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.workers = Arc::new(Semaphore::new(max_workers.max(1)));
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Search everything and return the unique items.
    ///
    /// Never fails: a source that keeps erroring contributes nothing. Items
    /// are ordered by task submission (general first, then entities in the
    /// order given), which also decides which duplicate survives. Dropping
    /// the returned future aborts every task still in flight.
    pub async fn aggregate(
        &self,
        query: &str,
        entities: &[String],
        ctx: &TurnContext,
    ) -> Vec<NewsItem> {
        let mut tasks = JoinSet::new();
        self.spawn_task(&mut tasks, 0, self.general.clone(), query.to_string(), ctx);
        for (i, entity) in entities.iter().enumerate() {
            self.spawn_task(&mut tasks, i + 1, self.financial.clone(), entity.clone(), ctx);
        }
        let task_count = entities.len() + 1;

        let mut batches: Vec<Vec<NewsItem>> = vec![Vec::new(); task_count];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, batch)) => batches[index] = batch,
                Err(e) => tracing::error!(error = %e, "retrieval task failed"),
            }
        }

        let unique = dedup_by_link(batches.into_iter().flatten().collect());
        tracing::debug!(query, tasks = task_count, count = unique.len(), "aggregated news");
        unique
    }

    fn spawn_task(
        &self,
        tasks: &mut JoinSet<(usize, Vec<NewsItem>)>,
        index: usize,
        adapter: Arc<dyn RetrievalAdapter>,
        input: String,
        ctx: &TurnContext,
    ) {
        let workers = self.workers.clone();
        let policy = self.policy;
        let ctx = ctx.clone();

        tasks.spawn(async move {
            let _permit = match ctx.guard(workers.acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => {
                    tracing::error!("retrieval worker pool closed");
                    return (index, Vec::new());
                }
                Err(_) => return (index, Vec::new()),
            };
            let label = adapter.name().to_string();
            let items = retry_with_backoff(&policy, &label, &ctx, || adapter.search(&input)).await;
            (index, items)
        });
    }
}

/// Keep the first item for each link, preserving order.
pub fn dedup_by_link(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.link.clone()))
        .collect()
}
