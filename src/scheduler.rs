use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::queue::TaskQueue;
use crate::task::{TaskError, TaskIndex, TaskResult};

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 100;

/// Results of one batch run, keyed by submission index.
///
/// Keys ascend in submission order; they are not necessarily contiguous if
/// items were removed from the queue before the run.
pub type ResultMap<T> = BTreeMap<TaskIndex, TaskResult<T>>;

/// Scheduler configuration, recognized at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of work items executing simultaneously.
    pub concurrency_limit: usize,
    /// Deadline for an entire batch run, not per item. `None` means no
    /// deadline.
    pub batch_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            batch_timeout: None,
        }
    }
}

/// Executes queued blocking work items concurrently, bounded by a semaphore,
/// within an optional batch-wide deadline.
///
/// Each scheduler owns its queue, limiter, and per-run result map; instances
/// are independent of each other. A run drains the queue wholesale before
/// dispatching, so the queue is empty after every run, successful or timed
/// out, and the scheduler can be reused immediately.
///
/// Per-item failures are isolated: a work item that panics or returns `Err`
/// leaves a [`TaskError`] marker at its index while the rest of the batch
/// completes. Only the batch deadline fails a run as a whole, and a timed-out
/// run discards all results, including those recorded before expiry. Callables
/// still blocking after expiry keep their limiter slots until they return, so
/// the concurrency limit holds even across a timed-out run and the next one.
#[derive(Debug)]
pub struct Scheduler<T> {
    queue: TaskQueue<T>,
    limiter: Arc<Semaphore>,
    config: SchedulerConfig,
}

impl<T> Scheduler<T>
where
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        // A zero-capacity limiter would never admit anything.
        let capacity = config.concurrency_limit.max(1);
        Self {
            queue: TaskQueue::new(),
            limiter: Arc::new(Semaphore::new(capacity)),
            config,
        }
    }

    /// Queue one work item per argument value. See [`TaskQueue::enqueue`].
    pub fn enqueue<F, A, I>(&mut self, f: F, args: I)
    where
        F: Fn(A) -> T + Send + Sync + 'static,
        A: Send + 'static,
        I: IntoIterator<Item = A>,
    {
        self.queue.enqueue(f, args);
    }

    /// Queue fallible work items. See [`TaskQueue::enqueue_fallible`].
    pub fn enqueue_fallible<F, A, I>(&mut self, f: F, args: I)
    where
        F: Fn(A) -> anyhow::Result<T> + Send + Sync + 'static,
        A: Send + 'static,
        I: IntoIterator<Item = A>,
    {
        self.queue.enqueue_fallible(f, args);
    }

    /// Number of pending work items.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop all pending items without running them.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Drop the pending items with the given indices without running them.
    pub fn remove<I>(&mut self, indices: I)
    where
        I: IntoIterator<Item = TaskIndex>,
    {
        self.queue.remove(indices);
    }

    /// Execute everything queued and return the results keyed by submission
    /// index. Blocks (suspends) until the whole batch has settled.
    ///
    /// An empty queue returns an empty map immediately, without touching the
    /// limiter or starting the deadline timer. On deadline expiry the run
    /// returns [`Error::BatchTimeout`] and no result map; the queue is
    /// drained either way.
    pub async fn run(&mut self) -> Result<ResultMap<T>> {
        let items = self.queue.drain();
        if items.is_empty() {
            return Ok(ResultMap::new());
        }

        let batch_size = items.len();
        let started = Instant::now();
        tracing::debug!(
            batch_size,
            limit = self.config.concurrency_limit,
            "dispatching batch"
        );

        let mut in_flight = JoinSet::new();
        for item in items {
            let limiter = Arc::clone(&self.limiter);
            in_flight.spawn(async move {
                // The limiter is never closed, so acquisition cannot fail.
                let permit = limiter
                    .acquire_owned()
                    .await
                    .expect("limiter semaphore closed");
                let index = item.index();
                // Off-load the blocking callable so it cannot stall the
                // coordination logic. The permit moves into the closure: a
                // blocking callable cannot be interrupted by abort, so its
                // slot must stay occupied until it returns.
                match tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    item.invoke()
                })
                .await
                {
                    Ok(settled) => settled,
                    Err(err) => (
                        index,
                        Err(TaskError {
                            index,
                            reason: err.to_string(),
                        }),
                    ),
                }
            });
        }

        let mut results = ResultMap::new();
        match self.config.batch_timeout {
            Some(deadline) => {
                let gather = collect_settled(&mut in_flight, &mut results);
                let timed_out = tokio::time::timeout(deadline, gather).await.is_err();
                if timed_out {
                    in_flight.abort_all();
                    tracing::warn!(
                        batch_size,
                        settled = results.len(),
                        ?deadline,
                        "batch deadline expired"
                    );
                    return Err(Error::BatchTimeout(deadline));
                }
            }
            None => collect_settled(&mut in_flight, &mut results).await,
        }

        tracing::info!(batch_size, elapsed = ?started.elapsed(), "batch completed");
        Ok(results)
    }

    /// Like [`run`](Scheduler::run), but returns the results as a sequence in
    /// ascending submission-index order.
    ///
    /// If items were removed before the run, the sequence is compact (its
    /// length matches the number of items actually dispatched), not padded.
    pub async fn run_sorted(&mut self) -> Result<Vec<TaskResult<T>>> {
        Ok(self.run().await?.into_values().collect())
    }
}

impl<T> Default for Scheduler<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Insert each unit's result as it settles. Each unit returns its own
/// `(index, result)` pair, so every map slot has exactly one writer.
async fn collect_settled<T>(
    in_flight: &mut JoinSet<(TaskIndex, TaskResult<T>)>,
    results: &mut ResultMap<T>,
) where
    T: Send + 'static,
{
    while let Some(joined) = in_flight.join_next().await {
        match joined {
            Ok((index, result)) => {
                results.insert(index, result);
            }
            // Work-item panics are caught in `invoke`, so a join error here
            // means the unit was aborted mid-flight.
            Err(err) => tracing::warn!(%err, "dispatch unit aborted before settling"),
        }
    }
}
