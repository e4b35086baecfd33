use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use filegate_protocol::RemoteEntry;

use crate::{FileTransfer, TransferError};

#[derive(Default)]
struct Remote {
    connected: bool,
    /// Full remote path -> contents.
    files: BTreeMap<String, Vec<u8>>,
    /// Non-file listing entries (directories, symlinks) per directory.
    extra: Vec<(String, RemoteEntry)>,
}

/// In-process transfer endpoint.
///
/// Backs the tests and the demo daemon. Failure injection toggles let tests
/// exercise the relay loops' error paths without a real endpoint.
#[derive(Default)]
pub struct MemoryTransfer {
    state: Mutex<Remote>,
    fail_connect: AtomicBool,
    fail_upload: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MemoryTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a file on the simulated remote endpoint.
    pub async fn seed_file(&self, remote_path: &str, contents: &[u8]) {
        let mut state = self.state.lock().await;
        state.files.insert(remote_path.to_owned(), contents.to_vec());
    }

    /// Adds a directory or symlink entry to a directory listing.
    pub async fn seed_entry(&self, dir: &str, entry: RemoteEntry) {
        let mut state = self.state.lock().await;
        state.extra.push((dir.to_owned(), entry));
    }

    /// Returns the contents stored at `remote_path`, if any.
    pub async fn stored(&self, remote_path: &str) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(remote_path).cloned()
    }

    /// Makes every subsequent connect fail until cleared.
    pub fn fail_connects(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent upload fail until cleared.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of disconnects so far.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn parent_of(path: &str) -> (&str, &str) {
        match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        }
    }
}

impl FileTransfer for MemoryTransfer {
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), TransferError> {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransferError::Unavailable("connect refused".into()));
        }
        let mut state = self.state.lock().await;
        state.connected = true;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        let state = self.state.lock().await;
        if !state.connected {
            return Err(TransferError::NotConnected);
        }
        let mut entries: Vec<RemoteEntry> = state
            .extra
            .iter()
            .filter(|(dir, _)| dir == path)
            .map(|(_, entry)| entry.clone())
            .collect();
        entries.extend(
            state
                .files
                .keys()
                .filter(|key| Self::parent_of(key).0 == path)
                .map(|key| RemoteEntry::file(Self::parent_of(key).1)),
        );
        Ok(entries)
    }

    async fn download(&self, remote_path: &str) -> Result<Vec<u8>, TransferError> {
        let state = self.state.lock().await;
        if !state.connected {
            return Err(TransferError::NotConnected);
        }
        state
            .files
            .get(remote_path)
            .cloned()
            .ok_or_else(|| TransferError::NotFound(remote_path.to_owned()))
    }

    async fn upload(&self, source: &[u8], remote_path: &str) -> Result<(), TransferError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(TransferError::NotConnected);
        }
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(TransferError::Unavailable("upload refused".into()));
        }
        state.files.insert(remote_path.to_owned(), source.to_vec());
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        state.connected = false;
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
