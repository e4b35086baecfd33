use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use filegate_transfer::{FileTransfer, TransferError, remote_join};

use crate::{DEFAULT_WORKER_POLL, IngressQueue, QueueItem};

/// Drains the ingress queue into the remote endpoint.
///
/// One dedicated loop: dequeue an item, upload it, drop its buffer, repeat.
/// A failed upload is logged and the item is dropped; there is no retry and
/// no requeue (at-most-once per item). Cancellation is observed between
/// items only, so an in-flight upload always completes.
pub struct UploadWorker<T: FileTransfer> {
    queue: Arc<IngressQueue>,
    transfer: Arc<T>,
    remote_dir: String,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<T: FileTransfer> UploadWorker<T> {
    pub fn new(
        queue: Arc<IngressQueue>,
        transfer: Arc<T>,
        remote_dir: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            transfer,
            remote_dir: remote_dir.into(),
            poll_interval: DEFAULT_WORKER_POLL,
            cancel,
        }
    }

    /// Overrides the empty-queue poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs until the cancellation token is set.
    pub async fn run(self) {
        tracing::info!(remote_dir = %self.remote_dir, "upload worker started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.queue.try_dequeue().await {
                Some(item) => self.process(item).await,
                None => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
        tracing::info!("upload worker stopped");
    }

    /// Uploads one item. The item (and its buffer) is dropped when this
    /// returns, whether the upload succeeded or not.
    async fn process(&self, item: QueueItem) {
        let remote_path = remote_join(&self.remote_dir, &item.name);
        match self.upload_one(&item, &remote_path).await {
            Ok(()) => {
                tracing::info!(name = %item.name, %remote_path, "file uploaded");
            }
            Err(e) => {
                tracing::error!(name = %item.name, error = %e, "upload failed");
            }
        }
    }

    async fn upload_one(&self, item: &QueueItem, remote_path: &str) -> Result<(), TransferError> {
        self.transfer.connect(&self.cancel).await?;
        let result = self.transfer.upload(&item.data, remote_path).await;
        // Disconnect is unconditional so a failed upload cannot leak a session.
        self.transfer.disconnect().await;
        result
    }
}
