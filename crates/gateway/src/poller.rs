use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use filegate_broker::{BrokerClient, Publisher};
use filegate_transfer::{FileTransfer, TransferError, remote_join};

/// A file captured from the remote endpoint during one poll cycle.
struct FetchedFile {
    name: String,
    extension: String,
    data: Vec<u8>,
}

/// Polls the remote source directory and republishes every discovered file
/// onto the broker under a fixed logical tag.
///
/// Each cycle opens its own session and closes it unconditionally; a failed
/// cycle is logged and the loop retries on the next interval tick.
pub struct DownloadPoller<T: FileTransfer, B: BrokerClient> {
    transfer: Arc<T>,
    publisher: Arc<Publisher<B>>,
    source_dir: String,
    tag: String,
    interval: Duration,
    cancel: CancellationToken,
}

impl<T: FileTransfer, B: BrokerClient> Clone for DownloadPoller<T, B> {
    fn clone(&self) -> Self {
        Self {
            transfer: Arc::clone(&self.transfer),
            publisher: Arc::clone(&self.publisher),
            source_dir: self.source_dir.clone(),
            tag: self.tag.clone(),
            interval: self.interval,
            cancel: self.cancel.clone(),
        }
    }
}

impl<T: FileTransfer, B: BrokerClient> DownloadPoller<T, B> {
    pub fn new(
        transfer: Arc<T>,
        publisher: Arc<Publisher<B>>,
        source_dir: impl Into<String>,
        tag: impl Into<String>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transfer,
            publisher,
            source_dir: source_dir.into(),
            tag: tag.into(),
            interval,
            cancel,
        }
    }

    /// Runs until the cancellation token is set.
    pub async fn run(self) {
        tracing::info!(source_dir = %self.source_dir, tag = %self.tag, "download poller started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.relay_once().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "poll cycle relayed files");
                    }
                }
                Err(e) => {
                    // A bad cycle is never fatal; retry on the next tick.
                    tracing::error!(error = %e, "poll cycle failed");
                }
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::info!("download poller stopped");
    }

    /// One complete cycle: fetch everything from the source directory, then
    /// publish the captured files. Publishing starts only after the listing
    /// pass has finished and the session is closed.
    pub async fn relay_once(&self) -> Result<usize, TransferError> {
        let files = self.fetch_cycle().await?;
        let count = files.len();
        for file in &files {
            tracing::info!(name = %file.name, "publishing file to queue");
            if let Err(e) = self
                .publisher
                .publish_file(&self.tag, &file.data, &file.extension)
                .await
            {
                tracing::error!(name = %file.name, error = %e, "failed to publish file");
            }
        }
        Ok(count)
    }

    /// Downloads every regular file in the source directory to a local
    /// directory instead of the broker (the direct-download variant).
    pub async fn download_to_dir(&self, local_dir: &Path) -> Result<usize, TransferError> {
        let files = self.fetch_cycle().await?;
        tokio::fs::create_dir_all(local_dir).await?;
        let count = files.len();
        for file in files {
            let path = local_dir.join(&file.name);
            tokio::fs::write(&path, &file.data).await?;
            tracing::info!(path = %path.display(), "file downloaded");
        }
        Ok(count)
    }

    /// Connect, capture, disconnect. Disconnect is unconditional on every
    /// exit path so no remote session is leaked.
    async fn fetch_cycle(&self) -> Result<Vec<FetchedFile>, TransferError> {
        self.transfer.connect(&self.cancel).await?;
        let result = self.fetch_all().await;
        self.transfer.disconnect().await;
        result
    }

    async fn fetch_all(&self) -> Result<Vec<FetchedFile>, TransferError> {
        let entries = self.transfer.list_directory(&self.source_dir).await?;
        let mut files = Vec::new();
        for entry in entries {
            if entry.is_dir || entry.is_symlink {
                continue;
            }
            let remote_path = remote_join(&self.source_dir, &entry.name);
            match self.transfer.download(&remote_path).await {
                Ok(data) => {
                    tracing::info!(name = %entry.name, size = data.len(), "file downloaded");
                    files.push(FetchedFile {
                        extension: entry.extension(),
                        name: entry.name,
                        data,
                    });
                }
                Err(e) => {
                    // Keep what was already captured; the rest waits for the
                    // next cycle.
                    tracing::error!(name = %entry.name, error = %e, "download failed");
                    break;
                }
            }
        }
        Ok(files)
    }
}
