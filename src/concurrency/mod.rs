//! Bounded concurrency for task batches
//!
//! Two scheduling strategies:
//! - [`WorkerPool`]: a fixed number of slots; a slot pulls the next task the
//!   moment its current one settles ([`concur_request`]).
//! - [`BatchedWindows`]: the queue is cut into consecutive windows; a window
//!   starts only after the previous one resolved under its [`WindowMode`]
//!   ([`to_concurrency`]).
//!
//! Both keep results index-stable: the outcome of task *i* lands at position
//! *i* whatever the completion order.

mod pool;
mod windows;

pub use pool::{concur_request, PoolOptions, WorkerPool};
pub use windows::{to_concurrency, BatchedWindows, WindowMode, WindowOptions};

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;

type TaskFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

enum TaskKind<T> {
    Call(Box<dyn FnOnce() -> TaskFuture<T> + Send>),
    Blocking(Box<dyn FnOnce() -> anyhow::Result<T> + Send>),
    Pending(TaskFuture<T>),
}

/// One unit of work in a batch.
///
/// Callables are invoked exactly once, when a slot picks the task up.
pub struct Task<T> {
    kind: TaskKind<T>,
}

impl<T: Send + 'static> Task<T> {
    /// An async callable
    pub fn call<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            kind: TaskKind::Call(Box::new(move || f().boxed())),
        }
    }

    /// A synchronous callable, run on the slot that picks it up
    pub fn blocking<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        Self {
            kind: TaskKind::Blocking(Box::new(f)),
        }
    }

    /// An already-created future.
    ///
    /// Futures are lazy: it does no work until its slot polls it.
    pub fn pending<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            kind: TaskKind::Pending(future.boxed()),
        }
    }

    fn into_future(self) -> TaskFuture<T> {
        match self.kind {
            TaskKind::Call(f) => f(),
            TaskKind::Blocking(f) => async move { f() }.boxed(),
            TaskKind::Pending(future) => future,
        }
    }

    /// Run the task to completion, turning panics into rejections
    async fn settle(self) -> Settled<T> {
        let outcome = AssertUnwindSafe(async move { self.into_future().await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(result) => Settled::from(result),
            Err(payload) => {
                let err = panic_error(payload);
                warn!(error = %err, "task panicked");
                Settled::Rejected(err)
            }
        }
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            TaskKind::Call(_) => "call",
            TaskKind::Blocking(_) => "blocking",
            TaskKind::Pending(_) => "pending",
        };
        f.debug_struct("Task").field("kind", &kind).finish()
    }
}

/// Outcome of one task: the `{success, value}` record
#[derive(Debug)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(anyhow::Error),
}

impl<T> Settled<T> {
    pub fn success(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Settled::Fulfilled(value) => Some(value),
            Settled::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(err) => Some(err),
        }
    }

    pub fn into_result(self) -> anyhow::Result<T> {
        match self {
            Settled::Fulfilled(value) => Ok(value),
            Settled::Rejected(err) => Err(err),
        }
    }
}

impl<T> From<anyhow::Result<T>> for Settled<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Settled::Fulfilled(value),
            Err(err) => Settled::Rejected(err),
        }
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    anyhow::anyhow!("task panicked: {}", message)
}

fn join_error(err: tokio::task::JoinError) -> anyhow::Error {
    if err.is_panic() {
        panic_error(err.into_panic())
    } else {
        anyhow::anyhow!("task was cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_is_invoked_when_settled() {
        let task = Task::call(|| async { Ok(7) });
        assert_eq!(task.settle().await.value(), Some(&7));
    }

    #[tokio::test]
    async fn blocking_and_pending_tasks() {
        let blocking = Task::blocking(|| Ok("done"));
        assert!(blocking.settle().await.success());

        let pending = Task::pending(async { Err::<(), _>(anyhow::anyhow!("boom")) });
        let settled = pending.settle().await;
        assert!(!settled.success());
        assert_eq!(settled.error().unwrap().to_string(), "boom");
    }

    #[tokio::test]
    async fn panics_become_rejections() {
        let task: Task<()> = Task::blocking(|| panic!("kaboom"));
        let settled = task.settle().await;
        assert_eq!(
            settled.error().unwrap().to_string(),
            "task panicked: kaboom"
        );
    }

    #[test]
    fn settled_conversions() {
        let ok: Settled<i32> = Ok(1).into();
        assert_eq!(ok.into_result().unwrap(), 1);
        let err: Settled<i32> = Err(anyhow::anyhow!("no")).into();
        assert!(err.value().is_none());
    }
}
