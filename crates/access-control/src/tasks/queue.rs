//! Unbounded FIFO of deferred work shared by request handlers and task workers.
//!
//! Producers call [`DeferredTaskQueue::enqueue`], which never blocks. Consumers
//! call [`DeferredTaskQueue::dequeue`], which waits until an item is available
//! or the supplied cancellation token fires.
//!
//! Every enqueued item adds one semaphore permit after it is pushed, and every
//! dequeue forgets one permit before it pops, so the permit count never exceeds
//! the number of queued items.

use crate::observability::metrics;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The cancellation token fired before an item was taken. Nothing was removed.
    #[error("Dequeue cancelled")]
    Cancelled,
}

pub struct DeferredTaskQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Semaphore,
}

impl<T> Default for DeferredTaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeferredTaskQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Semaphore::new(0),
        }
    }

    /// Append `item` to the tail and wake one waiting consumer.
    pub fn enqueue(&self, item: T) {
        {
            let mut items = self.lock();
            items.push_back(item);
            // Published under the lock so concurrent updates land in order.
            metrics::set_task_queue_depth(items.len());
        }
        self.available.add_permits(1);
    }

    /// Take the item at the head, waiting until one exists.
    ///
    /// Returns `QueueError::Cancelled` without touching the queue if `cancel`
    /// has fired, including when items are still pending.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<T, QueueError> {
        loop {
            if cancel.is_cancelled() {
                return Err(QueueError::Cancelled);
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(QueueError::Cancelled),

                permit = self.available.acquire() => {
                    // The semaphore is never closed.
                    let Ok(permit) = permit else {
                        return Err(QueueError::Cancelled);
                    };
                    permit.forget();

                    let item = {
                        let mut items = self.lock();
                        let item = items.pop_front();
                        metrics::set_task_queue_depth(items.len());
                        item
                    };

                    if let Some(item) = item {
                        return Ok(item);
                    }
                }
            }
        }
    }

    /// Number of items waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-mutated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for DeferredTaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredTaskQueue")
            .field("len", &self.len())
            .finish()
    }
}
