use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{Mutex, Semaphore};

use crate::{DEFAULT_QUEUE_CAPACITY, QueueError};

/// A pending outbound file payload.
///
/// Exclusively owned by the queue until dequeued; the buffer is released
/// when the upload worker drops the item, on every exit path.
#[derive(Debug)]
pub struct QueueItem {
    pub data: Vec<u8>,
    pub name: String,
}

impl QueueItem {
    pub fn new(data: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            data,
            name: name.into(),
        }
    }
}

/// What to do when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait for the worker to free a slot.
    #[default]
    Block,
    /// Evict the oldest pending item to make room.
    DropOldest,
    /// Refuse the new item with [`QueueError::Full`].
    Reject,
}

/// Thread-safe FIFO of pending outbound payloads.
///
/// Bounded: capacity is tracked by a semaphore so the `Block` policy can
/// await a free slot without holding the queue lock. FIFO order is preserved
/// end-to-end: the first item enqueued is the first uploaded.
pub struct IngressQueue {
    items: Mutex<VecDeque<QueueItem>>,
    slots: Semaphore,
    policy: OverflowPolicy,
}

impl IngressQueue {
    /// Creates a queue with the default capacity and `Block` policy.
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_QUEUE_CAPACITY, OverflowPolicy::default())
    }

    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            slots: Semaphore::new(capacity),
            policy,
        }
    }

    /// Copies the entire `source` into an owned buffer and appends it at the
    /// tail. The caller is never blocked on downstream processing, only on
    /// reading its own input (and on a free slot under the `Block` policy).
    pub async fn enqueue<R>(&self, mut source: R, name: &str) -> Result<(), QueueError>
    where
        R: AsyncRead + Unpin,
    {
        let mut data = Vec::new();
        source.read_to_end(&mut data).await?;
        self.push(QueueItem::new(data, name)).await
    }

    /// Appends an already-built item at the tail.
    pub async fn push(&self, item: QueueItem) -> Result<(), QueueError> {
        match self.policy {
            OverflowPolicy::Block => {
                let permit = self
                    .slots
                    .acquire()
                    .await
                    .map_err(|_| QueueError::Closed)?;
                permit.forget();
            }
            OverflowPolicy::Reject => match self.slots.try_acquire() {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(QueueError::Full),
            },
            OverflowPolicy::DropOldest => {
                // Acquire-or-evict and the insert happen under one lock
                // acquisition. Permits only move while the lock is held, so
                // a failed acquire means the queue really is full and the
                // evicted item's slot carries over to the new one.
                let mut items = self.items.lock().await;
                match self.slots.try_acquire() {
                    Ok(permit) => permit.forget(),
                    Err(_) => {
                        if let Some(old) = items.pop_front() {
                            tracing::warn!(name = %old.name, "queue full, dropping oldest item");
                        }
                    }
                }
                items.push_back(item);
                return Ok(());
            }
        }
        self.items.lock().await.push_back(item);
        Ok(())
    }

    /// Removes and returns the head, or `None` without blocking.
    pub async fn try_dequeue(&self) -> Option<QueueItem> {
        let mut items = self.items.lock().await;
        let item = items.pop_front();
        // The permit goes back while the lock is held, keeping
        // permits + items equal to the capacity at all times.
        if item.is_some() {
            self.slots.add_permits(1);
        }
        item
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

impl Default for IngressQueue {
    fn default() -> Self {
        Self::new()
    }
}
