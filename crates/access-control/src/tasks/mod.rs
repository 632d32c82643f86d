//! Deferred side-effect work.
//!
//! Request handlers push [`DeferredTask`]s onto a [`DeferredTaskQueue`] and
//! return immediately. A [`TaskWorker`] pulls them off in FIFO order and runs
//! each one against a fresh [`TaskScope`].
//!
//! Execution is at-most-once: a task that fails or panics is logged and
//! dropped, never retried.

pub mod queue;
pub mod scope;
pub mod worker;

pub use queue::{DeferredTaskQueue, QueueError};
pub use scope::{PgScopeFactory, ScopeFactory, TaskScope};
pub use worker::{TaskWorker, TaskWorkerHandle, TaskWorkerPool, WorkerState};

use crate::errors::AcError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Queue of deferred tasks shared by producers and workers.
pub type TaskQueue = DeferredTaskQueue<DeferredTask>;

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), AcError>> + Send>>;

/// A unit of deferred work.
///
/// The closure captures only the data it needs and receives its collaborators
/// through the scope it is run against.
pub struct DeferredTask {
    kind: &'static str,
    work: Box<dyn FnOnce(TaskScope) -> TaskFuture + Send>,
}

impl DeferredTask {
    /// `kind` labels logs and metrics, so keep it to a small fixed set.
    pub fn new<F, Fut>(kind: &'static str, work: F) -> Self
    where
        F: FnOnce(TaskScope) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AcError>> + Send + 'static,
    {
        Self {
            kind,
            work: Box::new(move |scope| Box::pin(work(scope))),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Consume the task and run it.
    pub async fn run(self, scope: TaskScope) -> Result<(), AcError> {
        (self.work)(scope).await
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
