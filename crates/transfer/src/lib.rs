//! Remote file-transfer capability for the filegate relay.
//!
//! [`FileTransfer`] abstracts the remote endpoint (connect, list, download,
//! upload, disconnect) so the relay loops never see a wire protocol. The
//! crate ships [`MemoryTransfer`], an in-process endpoint used by the tests
//! and the demo daemon; a production SFTP binding implements the same trait.
//!
//! The trait carries no retry logic. Callers own error recovery at their
//! loop boundary.

mod config;
mod memory;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use filegate_protocol::RemoteEntry;

pub use config::TransferConfig;
pub use memory::MemoryTransfer;

/// Errors produced by a transfer endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not connected")]
    NotConnected,

    #[error("operation cancelled")]
    Cancelled,

    #[error("remote path not found: {0}")]
    NotFound(String),

    #[error("endpoint unavailable: {0}")]
    Unavailable(String),
}

/// Capability wrapper over a remote file endpoint.
///
/// Implementations hold their own session state behind `&self`; a client
/// handle must not be shared across loops (each loop owns its client for
/// its cycle or lifetime).
pub trait FileTransfer: Send + Sync {
    /// Opens a session to the remote endpoint, honoring `cancel` so a
    /// shutdown request unblocks a pending connect promptly.
    fn connect(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;

    /// Lists the entries of a remote directory.
    fn list_directory(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Vec<RemoteEntry>, TransferError>> + Send;

    /// Downloads the full contents of `remote_path` into an owned buffer.
    fn download(
        &self,
        remote_path: &str,
    ) -> impl Future<Output = Result<Vec<u8>, TransferError>> + Send;

    /// Uploads `source` to `remote_path`.
    fn upload(
        &self,
        source: &[u8],
        remote_path: &str,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;

    /// Closes the session. Safe to call when already disconnected.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;
}

/// Joins a remote directory and file name with `/`, the remote separator.
pub fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{}/{name}", dir.trim_end_matches('/'))
    }
}
