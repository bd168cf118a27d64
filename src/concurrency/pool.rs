//! Self-refilling worker pool

use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use super::{Settled, Task};
use crate::limits::{ResourceLimits, DEFAULT_CONCURRENCY};

/// Options for [`WorkerPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of slots; 0 is treated as 1
    pub limit: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CONCURRENCY,
        }
    }
}

impl PoolOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Runs a batch with at most `limit` tasks in flight, refilling each slot as
/// soon as its task settles. Failures never abort the batch.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    options: PoolOptions,
    limits: ResourceLimits,
}

impl WorkerPool {
    pub fn new(options: PoolOptions) -> Self {
        Self {
            options,
            limits: ResourceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Number of slots a batch of `len` tasks gets
    pub fn slots(&self, len: usize) -> usize {
        self.limits.clamp_concurrency(self.options.limit).min(len)
    }

    #[instrument(skip_all, fields(tasks = tasks.len(), limit = self.options.limit))]
    pub async fn run<T: Send + 'static>(&self, tasks: Vec<Task<T>>) -> Vec<Settled<T>> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let total = tasks.len();
        let slots = self.slots(total);
        let mut queue = tasks.into_iter().enumerate();
        let mut results: Vec<Option<Settled<T>>> = (0..total).map(|_| None).collect();
        let mut join_set = JoinSet::new();

        for (index, task) in queue.by_ref().take(slots) {
            spawn_slot(&mut join_set, index, task);
        }
        debug!(slots, total, "worker pool started");

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, settled)) => {
                    debug!(index, success = settled.success(), "task settled");
                    results[index] = Some(settled);
                }
                // Panics are caught inside the slot, so only an aborted runtime lands here
                Err(err) => warn!(error = %err, "worker slot failed to join"),
            }
            if let Some((index, task)) = queue.next() {
                spawn_slot(&mut join_set, index, task);
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(index, settled)| {
                settled.unwrap_or_else(|| {
                    Settled::Rejected(anyhow::anyhow!("task {} did not complete", index))
                })
            })
            .collect()
    }
}

fn spawn_slot<T: Send + 'static>(
    join_set: &mut JoinSet<(usize, Settled<T>)>,
    index: usize,
    task: Task<T>,
) {
    join_set.spawn(async move { (index, task.settle().await) });
}

/// Run `tasks` through a [`WorkerPool`] with `limit` slots
pub async fn concur_request<T: Send + 'static>(
    tasks: Vec<Task<T>>,
    limit: usize,
) -> Vec<Settled<T>> {
    WorkerPool::new(PoolOptions::default().with_limit(limit))
        .run(tasks)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn empty_batch() {
        let results = concur_request::<()>(Vec::new(), 3).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_runs_one_at_a_time() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks = (0..4)
            .map(|i| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                Task::call(move || async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                })
            })
            .collect();

        let results = concur_request(tasks, 0).await;
        assert_eq!(results.len(), 4);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn slots_respect_resource_limits() {
        let pool = WorkerPool::new(PoolOptions::default().with_limit(100))
            .with_limits(ResourceLimits::testing());
        assert_eq!(pool.slots(10), 4);
        assert_eq!(pool.slots(2), 2);
        assert_eq!(WorkerPool::default().slots(10), DEFAULT_CONCURRENCY);
    }
}
