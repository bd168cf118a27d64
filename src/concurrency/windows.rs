//! Lock-step fixed windows

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tracing::{debug, instrument};

use super::{join_error, Settled, Task};
use crate::error::RevalueError;
use crate::limits::{ResourceLimits, DEFAULT_CONCURRENCY};

/// How a window resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    /// Every task must fulfil; the first rejection fails the call
    #[default]
    All,
    /// Record every outcome; never fails
    AllSettled,
    /// The first task to settle decides the window
    Race,
}

/// Options for [`BatchedWindows`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    /// Window size; 0 is treated as 1
    pub limit: usize,
    pub mode: WindowMode,
    /// Spawn tasks onto the runtime instead of polling them in place
    pub is_async: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CONCURRENCY,
            mode: WindowMode::All,
            is_async: true,
        }
    }
}

impl WindowOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

type Outcome<T> = BoxFuture<'static, (usize, Settled<T>)>;

/// Cuts the queue into consecutive windows of `limit` tasks. Window *i+1*
/// starts only after window *i* resolved under the configured mode.
///
/// With `is_async` set, tasks are spawned with `tokio::spawn`, so `run` must
/// be called from inside a tokio runtime. Race losers then keep running
/// detached; without `is_async` they are dropped.
#[derive(Debug, Clone, Default)]
pub struct BatchedWindows {
    options: WindowOptions,
    limits: ResourceLimits,
}

impl BatchedWindows {
    pub fn new(options: WindowOptions) -> Self {
        Self {
            options,
            limits: ResourceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Outcomes in input order. `Race` contributes one entry per window.
    #[instrument(skip_all, fields(tasks = tasks.len(), limit = self.options.limit, mode = ?self.options.mode))]
    pub async fn run<T: Send + 'static>(
        &self,
        tasks: Vec<Task<T>>,
    ) -> Result<Vec<Settled<T>>, RevalueError> {
        let size = self.limits.clamp_concurrency(self.options.limit);
        let mut results = Vec::with_capacity(tasks.len());
        let mut queue = tasks.into_iter().enumerate().peekable();
        let mut window_number = 0usize;

        while queue.peek().is_some() {
            let window: Vec<Outcome<T>> = queue
                .by_ref()
                .take(size)
                .map(|(index, task)| self.launch(index, task))
                .collect();
            debug!(window = window_number, size = window.len(), "window started");

            match self.options.mode {
                WindowMode::All => {
                    let fulfilled = future::try_join_all(window.into_iter().map(|outcome| {
                        outcome.map(|(index, settled)| match settled {
                            Settled::Fulfilled(value) => Ok(value),
                            Settled::Rejected(source) => Err(RevalueError::Task { index, source }),
                        })
                    }))
                    .await?;
                    results.extend(fulfilled.into_iter().map(Settled::Fulfilled));
                }
                WindowMode::AllSettled => {
                    let settled = future::join_all(window).await;
                    results.extend(settled.into_iter().map(|(_, settled)| settled));
                }
                WindowMode::Race => {
                    let ((index, settled), _, losers) = future::select_all(window).await;
                    debug!(index, losers = losers.len(), "race decided");
                    drop(losers);
                    match settled {
                        Settled::Fulfilled(value) => results.push(Settled::Fulfilled(value)),
                        Settled::Rejected(source) => {
                            return Err(RevalueError::Task { index, source })
                        }
                    }
                }
            }
            window_number += 1;
        }

        Ok(results)
    }

    fn launch<T: Send + 'static>(&self, index: usize, task: Task<T>) -> Outcome<T> {
        if self.options.is_async {
            let handle = tokio::spawn(task.settle());
            async move {
                match handle.await {
                    Ok(settled) => (index, settled),
                    Err(err) => (index, Settled::Rejected(join_error(err))),
                }
            }
            .boxed()
        } else {
            async move { (index, task.settle().await) }.boxed()
        }
    }
}

/// Run `tasks` through [`BatchedWindows`] configured by `options`
pub async fn to_concurrency<T: Send + 'static>(
    tasks: Vec<Task<T>>,
    options: WindowOptions,
) -> Result<Vec<Settled<T>>, RevalueError> {
    BatchedWindows::new(options).run(tasks).await
}
