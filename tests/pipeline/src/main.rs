fn main() {
    println!("Run `cargo test -p pipeline` to execute end-to-end relay tests.");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use filegate_broker::{BrokerClient, MemoryBroker, Publisher};
    use filegate_gateway::{DownloadPoller, IngressQueue, UploadWorker};
    use filegate_listener::{ListenerConfig, ListenerController, SAVED_FILE_EXTENSION};
    use filegate_protocol::{
        EnrichedMessage, HEADER_EXTENSION, QueueBinding, SFTP_RELAY_TAG,
    };
    use filegate_transfer::MemoryTransfer;

    fn binding() -> QueueBinding {
        QueueBinding::new()
            .bind("server1", "queue1")
            .bind(SFTP_RELAY_TAG, "queue-sftp")
    }

    /// HTTP ingress stand-in -> ingress queue -> upload worker -> remote.
    #[tokio::test]
    async fn upload_pipeline_delivers_exact_bytes() {
        let queue = Arc::new(IngressQueue::new());
        let transfer = Arc::new(MemoryTransfer::new());
        let cancel = CancellationToken::new();

        queue.enqueue(&b"ten bytes!"[..], "f.txt").await.unwrap();

        let worker = UploadWorker::new(
            Arc::clone(&queue),
            Arc::clone(&transfer),
            "",
            cancel.clone(),
        )
        .with_poll_interval(Duration::from_millis(10));
        let handle = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transfer.stored("f.txt").await.unwrap(), b"ten bytes!");

        cancel.cancel();
        handle.await.unwrap();
    }

    /// Remote -> download poller -> broker, with the extension header.
    #[tokio::test]
    async fn download_relay_publishes_bytes_and_extension() {
        let transfer = Arc::new(MemoryTransfer::new());
        let broker = Arc::new(MemoryBroker::new());
        let payload = vec![7u8; 64];
        transfer.seed_file("outbox/x.bin", &payload).await;

        let publisher = Arc::new(Publisher::new(Arc::clone(&broker), binding()));
        let poller = DownloadPoller::new(
            transfer,
            publisher,
            "outbox",
            SFTP_RELAY_TAG,
            Duration::from_millis(10),
            CancellationToken::new(),
        );
        assert_eq!(poller.relay_once().await.unwrap(), 1);

        let mut rx = broker.subscribe("queue-sftp").await.unwrap();
        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.body, payload);
        assert_eq!(delivery.headers.get(HEADER_EXTENSION).unwrap(), ".bin");
    }

    /// Remote file all the way to a file on local disk through the broker.
    #[tokio::test]
    async fn full_relay_chain_remote_to_disk() {
        let transfer = Arc::new(MemoryTransfer::new());
        let broker = Arc::new(MemoryBroker::new());
        transfer.seed_file("outbox/doc.pdf", b"%PDF-1.7 fake").await;

        let tmp = tempfile::tempdir().unwrap();
        let save_dir = tmp.path().join("received");

        let controller = ListenerController::new(Arc::clone(&broker));
        controller
            .start(ListenerConfig {
                queue: "queue-sftp".into(),
                save_dir: save_dir.clone(),
                interval: Duration::from_millis(20),
            })
            .await;

        let publisher = Arc::new(Publisher::new(Arc::clone(&broker), binding()));
        let poller = DownloadPoller::new(
            transfer,
            publisher,
            "outbox",
            SFTP_RELAY_TAG,
            Duration::from_millis(10),
            CancellationToken::new(),
        );
        poller.relay_once().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let files: Vec<_> = std::fs::read_dir(&save_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(files[0].path()).unwrap(), b"%PDF-1.7 fake");
        assert!(
            files[0]
                .path()
                .to_string_lossy()
                .ends_with(SAVED_FILE_EXTENSION)
        );
        // Write happened, so the delivery must be acknowledged.
        assert_eq!(broker.unacked_count("queue-sftp").await, 0);

        controller.stop().await;
    }

    /// start/status/stop sequencing as seen from the control surface.
    #[tokio::test]
    async fn listener_control_surface_properties() {
        let broker = Arc::new(MemoryBroker::new());
        let tmp = tempfile::tempdir().unwrap();
        let controller = ListenerController::new(broker);

        // Idle stop is a no-op.
        controller.stop().await;
        assert!(!controller.status().await.is_running);

        let first = ListenerConfig {
            queue: "q-first".into(),
            save_dir: tmp.path().join("a"),
            interval: Duration::from_millis(20),
        };
        let second = ListenerConfig {
            queue: "q-second".into(),
            save_dir: tmp.path().join("b"),
            interval: Duration::from_millis(20),
        };

        controller.start(first).await;
        assert!(controller.status().await.is_running);

        // Second start without a stop keeps the first binding.
        controller.start(second).await;
        assert_eq!(controller.current_config().await.unwrap().queue, "q-first");

        controller.stop().await;
        assert!(!controller.status().await.is_running);
    }

    /// XML submitted for publish arrives as nested JSON in the envelope.
    #[tokio::test]
    async fn xml_publish_roundtrip() {
        let broker = Arc::new(MemoryBroker::new());
        let publisher = Publisher::new(Arc::clone(&broker), binding());

        publisher
            .publish_text("server1", "<a><b>1</b></a>")
            .await
            .unwrap();

        let mut rx = broker.subscribe("queue1").await.unwrap();
        let delivery = rx.recv().await.unwrap();
        let envelope: EnrichedMessage = serde_json::from_slice(&delivery.body).unwrap();
        assert_eq!(envelope.server_tag, "server1");

        let content: serde_json::Value = serde_json::from_str(&envelope.content).unwrap();
        assert_eq!(content, serde_json::json!({"a": {"b": "1"}}));
        // No attribute-derived keys survive the transform.
        assert!(!envelope.content.contains('@'));
    }

    /// Unregistered tags never reach the broker.
    #[tokio::test]
    async fn unknown_tag_reaches_no_queue() {
        let broker = Arc::new(MemoryBroker::new());
        let publisher = Publisher::new(Arc::clone(&broker), binding());

        publisher.publish_text("nowhere", "hello").await.unwrap();
        publisher.publish_file("nowhere", b"bytes", ".bin").await.unwrap();

        assert_eq!(broker.total_messages().await, 0);
        assert!(broker.declared_queues().await.is_empty());
    }
}
