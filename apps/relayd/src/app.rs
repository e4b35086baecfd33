//! Relay wiring and lifecycle.
//!
//! Builds the in-memory transports, spawns the upload worker and download
//! poller, starts the disk-writing listener, and tears everything down in
//! order on ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use filegate_broker::{MemoryBroker, Publisher};
use filegate_gateway::{DownloadPoller, IngressQueue, OverflowPolicy, UploadWorker};
use filegate_listener::{ListenerConfig, ListenerController};
use filegate_protocol::{QueueBinding, SFTP_RELAY_TAG};
use filegate_transfer::MemoryTransfer;

use crate::config::Config;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let transfer = Arc::new(MemoryTransfer::new());
    let broker = Arc::new(MemoryBroker::new());
    let binding: QueueBinding = config.routes.into_iter().collect();
    let publisher = Arc::new(Publisher::new(Arc::clone(&broker), binding));

    let queue = Arc::new(IngressQueue::with_policy(
        config.queue_capacity,
        OverflowPolicy::Block,
    ));
    let worker = UploadWorker::new(
        Arc::clone(&queue),
        Arc::clone(&transfer),
        config.transfer.source_dir.clone(),
        cancel.clone(),
    );
    let poller = DownloadPoller::new(
        Arc::clone(&transfer),
        publisher,
        config.transfer.source_dir.clone(),
        SFTP_RELAY_TAG,
        Duration::from_secs(config.poll_interval_secs),
        cancel.clone(),
    );

    let controller = ListenerController::new(Arc::clone(&broker));
    controller
        .start(ListenerConfig {
            queue: config.listener_queue,
            save_dir: config.save_dir.into(),
            interval: Duration::from_secs(config.listener_interval_secs),
        })
        .await;

    let worker_task = tokio::spawn(worker.run());
    let poller_task = tokio::spawn(poller.run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    cancel.cancel();
    controller.stop().await;
    worker_task.await?;
    poller_task.await?;

    Ok(())
}
