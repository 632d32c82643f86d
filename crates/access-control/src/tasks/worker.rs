//! Background worker loop that drains the deferred task queue.
//!
//! # Lifecycle
//!
//! `Running` until the cancellation token fires, then `Stopping` while any
//! in-flight task finishes, then `Stopped`. A stopping worker takes no further
//! items: anything still queued stays in the queue and is picked up by the
//! next worker started on it.
//!
//! # Failure isolation
//!
//! Each task runs in its own tokio task. An `Err` result, a panic, or a
//! failure to build the scope is logged and counted, and the loop moves on.

use super::{DeferredTask, QueueError, ScopeFactory, TaskQueue};
use crate::errors::AcError;
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopping,
    Stopped,
}

pub struct TaskWorker {
    id: usize,
    queue: Arc<TaskQueue>,
    scopes: Arc<dyn ScopeFactory>,
}

impl TaskWorker {
    pub fn new(id: usize, queue: Arc<TaskQueue>, scopes: Arc<dyn ScopeFactory>) -> Self {
        Self { id, queue, scopes }
    }

    /// Start the loop on the tokio runtime. It runs until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> TaskWorkerHandle {
        let (state_tx, state_rx) = watch::channel(WorkerState::Running);
        let span = tracing::info_span!("ac.tasks.worker", worker_id = self.id);
        let join = tokio::spawn(self.run(cancel.clone(), state_tx).instrument(span));

        TaskWorkerHandle {
            cancel,
            state: state_rx,
            join,
        }
    }

    async fn run(self, cancel: CancellationToken, state: watch::Sender<WorkerState>) {
        info!(target: "ac.tasks.worker", worker_id = self.id, "Task worker started");

        loop {
            let task = match self.queue.dequeue(&cancel).await {
                Ok(task) => task,
                Err(QueueError::Cancelled) => break,
            };
            self.execute(task, &cancel, &state).await;
        }

        state.send_replace(WorkerState::Stopping);

        let pending = self.queue.len();
        if pending > 0 {
            warn!(
                target: "ac.tasks.worker",
                worker_id = self.id,
                pending = pending,
                "Task worker stopped with tasks still queued"
            );
        } else {
            info!(target: "ac.tasks.worker", worker_id = self.id, "Task worker stopped");
        }

        state.send_replace(WorkerState::Stopped);
    }

    async fn execute(
        &self,
        task: DeferredTask,
        cancel: &CancellationToken,
        state: &watch::Sender<WorkerState>,
    ) {
        let kind = task.kind();
        let start = Instant::now();

        let scope = match self.scopes.create_scope().await {
            Ok(scope) => scope,
            Err(e) => {
                error!(
                    target: "ac.tasks.worker",
                    worker_id = self.id,
                    kind = kind,
                    error = %e,
                    "Failed to create task scope, dropping task"
                );
                metrics::record_deferred_task(kind, "error", start.elapsed());
                return;
            }
        };

        let mut handle = tokio::spawn(task.run(scope));

        // In-flight work always runs to completion, even after shutdown starts.
        let joined = tokio::select! {
            joined = &mut handle => joined,
            _ = cancel.cancelled() => {
                state.send_replace(WorkerState::Stopping);
                debug!(
                    target: "ac.tasks.worker",
                    worker_id = self.id,
                    kind = kind,
                    "Shutdown requested, finishing in-flight task"
                );
                handle.await
            }
        };

        let outcome = match joined {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                Err(AcError::TaskFailed("task panicked".to_string()))
            }
            Err(join_err) => Err(AcError::TaskFailed(join_err.to_string())),
        };

        let elapsed = start.elapsed();
        match outcome {
            Ok(()) => {
                debug!(
                    target: "ac.tasks.worker",
                    worker_id = self.id,
                    kind = kind,
                    duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Deferred task completed"
                );
                metrics::record_deferred_task(kind, "success", elapsed);
            }
            Err(e) => {
                error!(
                    target: "ac.tasks.worker",
                    worker_id = self.id,
                    kind = kind,
                    error = %e,
                    "Deferred task failed, not retrying"
                );
                metrics::record_deferred_task(kind, "error", elapsed);
            }
        }
    }
}

/// Handle to a spawned [`TaskWorker`].
pub struct TaskWorkerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<WorkerState>,
    join: JoinHandle<()>,
}

impl TaskWorkerHandle {
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    /// Signal the worker to stop and wait for its in-flight task to finish.
    pub async fn shutdown(self) -> Result<(), AcError> {
        self.cancel.cancel();
        self.join
            .await
            .map_err(|e| AcError::TaskFailed(format!("Task worker ended abnormally: {}", e)))
    }
}

/// Fixed-size group of workers sharing one queue.
pub struct TaskWorkerPool {
    cancel: CancellationToken,
    workers: Vec<TaskWorkerHandle>,
}

impl TaskWorkerPool {
    /// Spawn `count` workers. Each listens on a child of `cancel`.
    pub fn start(
        count: usize,
        queue: Arc<TaskQueue>,
        scopes: Arc<dyn ScopeFactory>,
        cancel: CancellationToken,
    ) -> Self {
        let workers = (0..count)
            .map(|id| {
                TaskWorker::new(id, Arc::clone(&queue), Arc::clone(&scopes))
                    .spawn(cancel.child_token())
            })
            .collect();

        info!(target: "ac.tasks.worker", worker_count = count, "Task worker pool started");

        Self { cancel, workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(TaskWorkerHandle::state).collect()
    }

    /// Stop every worker and wait for all of them.
    ///
    /// Returns the first abnormal exit, after every worker has been awaited.
    pub async fn shutdown(self) -> Result<(), AcError> {
        self.cancel.cancel();

        let mut first_error = None;
        for worker in self.workers {
            if let Err(e) = worker.shutdown().await {
                error!(target: "ac.tasks.worker", error = %e, "Task worker shutdown failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
