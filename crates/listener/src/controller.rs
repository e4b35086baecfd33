use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use filegate_broker::{BrokerClient, QueueOptions};
use filegate_protocol::Delivery;

use crate::SAVED_FILE_EXTENSION;

/// Binding captured by a `start` call.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub queue: String,
    pub save_dir: PathBuf,
    pub interval: Duration,
}

/// Snapshot returned by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerStatus {
    pub is_running: bool,
}

struct Active {
    config: ListenerConfig,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Lifecycle owner of one broker-consumption loop.
///
/// At most one loop runs per controller. All transitions go through a single
/// mutex, so concurrent start/stop calls cannot race: start while running and
/// stop while idle are warn-and-return no-ops.
pub struct ListenerController<B: BrokerClient> {
    broker: Arc<B>,
    active: Mutex<Option<Active>>,
}

impl<B: BrokerClient + 'static> ListenerController<B> {
    pub fn new(broker: Arc<B>) -> Self {
        Self {
            broker,
            active: Mutex::new(None),
        }
    }

    /// Spawns the consumption loop for `config` and marks the controller
    /// running. A second start without an intervening stop keeps the first
    /// binding and changes nothing.
    pub async fn start(&self, config: ListenerConfig) {
        let mut active = self.active.lock().await;
        if active.is_some() {
            tracing::warn!("listener is already running");
            return;
        }

        tracing::info!(
            queue = %config.queue,
            save_dir = %config.save_dir.display(),
            "starting listener"
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(consume(
            Arc::clone(&self.broker),
            config.clone(),
            cancel.clone(),
        ));
        *active = Some(Active {
            config,
            cancel,
            task,
        });
    }

    /// Cancels the consumption loop and waits for it to return before
    /// marking the controller idle. The loop finishes its in-flight message
    /// first.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        let Some(state) = active.take() else {
            tracing::warn!("listener is not running");
            return;
        };

        state.cancel.cancel();
        if let Err(e) = state.task.await {
            tracing::error!(error = %e, "listener task aborted abnormally");
        }
        tracing::info!("listener stopped");
    }

    /// Pure read of the running flag; no side effects.
    pub async fn status(&self) -> ListenerStatus {
        ListenerStatus {
            is_running: self.active.lock().await.is_some(),
        }
    }

    /// The binding of the currently running loop, if any.
    pub async fn current_config(&self) -> Option<ListenerConfig> {
        self.active.lock().await.as_ref().map(|a| a.config.clone())
    }
}

/// The consumption loop: declare, subscribe with manual ack, write each
/// delivery to disk and acknowledge only after the write succeeds.
async fn consume<B: BrokerClient>(broker: Arc<B>, config: ListenerConfig, cancel: CancellationToken) {
    if let Err(e) = broker.declare_queue(&config.queue, QueueOptions::default()).await {
        tracing::error!(queue = %config.queue, error = %e, "failed to declare queue");
        return;
    }
    let mut deliveries = match broker.subscribe(&config.queue).await {
        Ok(rx) => rx,
        Err(e) => {
            tracing::error!(queue = %config.queue, error = %e, "failed to subscribe");
            return;
        }
    };
    tracing::info!(queue = %config.queue, "listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            delivery = deliveries.recv() => match delivery {
                Some(delivery) => handle_delivery(broker.as_ref(), &config, delivery).await,
                None => {
                    tracing::warn!(queue = %config.queue, "broker went away");
                    break;
                }
            },
            // Idle tick: keeps the observed pacing and guarantees a stop
            // request is noticed even with no traffic.
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

async fn handle_delivery<B: BrokerClient>(broker: &B, config: &ListenerConfig, delivery: Delivery) {
    let delivery_tag = delivery.delivery_tag;
    match save_delivery(&config.save_dir, &delivery).await {
        Ok(path) => {
            tracing::info!(path = %path.display(), "file saved");
            // Ack strictly after the write: a crash before this point leaves
            // the message unacknowledged and eligible for redelivery.
            if let Err(e) = broker.ack(&config.queue, delivery_tag).await {
                tracing::error!(error = %e, "failed to acknowledge delivery");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to save message, leaving unacknowledged");
        }
    }
}

async fn save_delivery(save_dir: &Path, delivery: &Delivery) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(save_dir).await?;
    let name = format!("{}{SAVED_FILE_EXTENSION}", Uuid::new_v4());
    let path = save_dir.join(name);
    tokio::fs::write(&path, &delivery.body).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use filegate_broker::MemoryBroker;

    fn config(queue: &str, dir: &Path) -> ListenerConfig {
        ListenerConfig {
            queue: queue.to_owned(),
            save_dir: dir.to_owned(),
            interval: Duration::from_millis(20),
        }
    }

    fn saved_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        files.sort();
        files
    }

    #[tokio::test]
    async fn consumes_message_to_disk_and_acks() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");
        let controller = ListenerController::new(broker.clone());

        controller.start(config("q1", &dir)).await;
        broker.publish("q1", b"payload", HashMap::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let files = saved_files(&dir);
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"payload");
        assert!(files[0].to_string_lossy().ends_with(SAVED_FILE_EXTENSION));
        assert_eq!(broker.unacked_count("q1").await, 0);

        controller.stop().await;
    }

    #[tokio::test]
    async fn status_tracks_lifecycle() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        let controller = ListenerController::new(broker);

        assert!(!controller.status().await.is_running);
        controller.start(config("q1", tmp.path())).await;
        assert!(controller.status().await.is_running);
        controller.stop().await;
        assert!(!controller.status().await.is_running);
    }

    #[tokio::test]
    async fn double_start_keeps_first_binding() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        let controller = ListenerController::new(broker);

        controller.start(config("first", tmp.path())).await;
        controller.start(config("second", tmp.path())).await;

        let current = controller.current_config().await.unwrap();
        assert_eq!(current.queue, "first");

        controller.stop().await;
        assert!(!controller.status().await.is_running);
    }

    #[tokio::test]
    async fn stop_while_idle_is_noop() {
        let broker = Arc::new(MemoryBroker::new());
        let controller = ListenerController::new(broker);
        controller.stop().await;
        assert!(!controller.status().await.is_running);
    }

    #[tokio::test]
    async fn stop_waits_for_loop_even_with_long_interval() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        let controller = ListenerController::new(broker);

        controller
            .start(ListenerConfig {
                queue: "q1".into(),
                save_dir: tmp.path().to_owned(),
                interval: Duration::from_secs(3600),
            })
            .await;

        tokio::time::timeout(Duration::from_secs(1), controller.stop())
            .await
            .expect("stop did not complete promptly");
    }

    #[tokio::test]
    async fn restart_after_stop_uses_new_binding() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        let dir_a = tmp.path().join("a");
        let dir_b = tmp.path().join("b");
        let controller = ListenerController::new(broker.clone());

        controller.start(config("q1", &dir_a)).await;
        controller.stop().await;
        controller.start(config("q2", &dir_b)).await;

        broker.publish("q2", b"second", HashMap::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(saved_files(&dir_b).len(), 1);
        assert!(saved_files(&dir_a).is_empty());

        controller.stop().await;
    }

    #[tokio::test]
    async fn failed_write_leaves_message_unacked() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        // A file where the save directory should be makes create_dir_all fail.
        let blocked = tmp.path().join("blocked");
        std::fs::write(&blocked, b"not a dir").unwrap();

        let controller = ListenerController::new(broker.clone());
        controller.start(config("q1", &blocked)).await;
        broker.publish("q1", b"payload", HashMap::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(broker.unacked_count("q1").await, 1);
        controller.stop().await;
    }

    #[tokio::test]
    async fn backlog_published_before_start_is_consumed() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");

        broker.publish("q1", b"early", HashMap::new()).await.unwrap();

        let controller = ListenerController::new(broker.clone());
        controller.start(config("q1", &dir)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(saved_files(&dir).len(), 1);
        controller.stop().await;
    }
}
