//! The gateway side of the filegate relay.
//!
//! Three pieces, each owning one background concern:
//!
//! - [`IngressQueue`]: bounded FIFO handoff between the request path and
//!   the upload loop.
//! - [`UploadWorker`]: drains the queue one item at a time into the remote
//!   endpoint.
//! - [`DownloadPoller`]: polls the remote source directory and republishes
//!   every discovered file onto the broker.
//!
//! The loops are independent pipelines: FIFO order holds inside the ingress
//! queue, but there is no ordering guarantee across loops.

mod poller;
mod queue;
mod worker;

pub use poller::DownloadPoller;
pub use queue::{IngressQueue, OverflowPolicy, QueueItem};
pub use worker::UploadWorker;

/// Default poll interval for the upload worker when the queue is empty.
pub const DEFAULT_WORKER_POLL: std::time::Duration = std::time::Duration::from_secs(1);

/// Default capacity of the ingress queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Errors produced by the ingress queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue is full")]
    Full,

    #[error("queue is closed")]
    Closed,
}
