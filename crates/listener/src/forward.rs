use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;

use filegate_broker::{BrokerClient, QueueOptions};
use filegate_transform::{looks_like_xml, xml_to_json};

/// One forwarding binding: every message on `queue` is POSTed to `url`.
#[derive(Debug, Clone)]
pub struct ForwardRoute {
    pub queue: String,
    pub url: String,
}

/// Fixed-route listener that relays broker messages to HTTP endpoints.
///
/// Unlike [`ListenerController`](crate::ListenerController), the routes are
/// static for the forwarder's lifetime: one consumption task per queue, all
/// sharing one HTTP client. A forwarded delivery is acknowledged after the
/// attempt regardless of the HTTP outcome; a payload in an unrecognized
/// format is never forwarded and stays unacknowledged.
pub struct QueueForwarder<B: BrokerClient> {
    broker: Arc<B>,
    routes: Vec<ForwardRoute>,
    client: reqwest::Client,
    cancel: CancellationToken,
}

impl<B: BrokerClient + 'static> QueueForwarder<B> {
    pub fn new(broker: Arc<B>, routes: Vec<ForwardRoute>, cancel: CancellationToken) -> Self {
        Self {
            broker,
            routes,
            client: reqwest::Client::new(),
            cancel,
        }
    }

    /// Runs one consumption task per route until cancellation.
    pub async fn run(self) {
        let mut tasks = Vec::new();
        for route in self.routes {
            tracing::info!(queue = %route.queue, url = %route.url, "forwarding queue");
            tasks.push(tokio::spawn(forward_queue(
                Arc::clone(&self.broker),
                route,
                self.client.clone(),
                self.cancel.clone(),
            )));
        }
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "forward task aborted abnormally");
            }
        }
        tracing::info!("queue forwarder stopped");
    }
}

async fn forward_queue<B: BrokerClient>(
    broker: Arc<B>,
    route: ForwardRoute,
    client: reqwest::Client,
    cancel: CancellationToken,
) {
    if let Err(e) = broker.declare_queue(&route.queue, QueueOptions::default()).await {
        tracing::error!(queue = %route.queue, error = %e, "failed to declare queue");
        return;
    }
    let mut deliveries = match broker.subscribe(&route.queue).await {
        Ok(rx) => rx,
        Err(e) => {
            tracing::error!(queue = %route.queue, error = %e, "failed to subscribe");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            delivery = deliveries.recv() => {
                let Some(delivery) = delivery else { break };
                let text = String::from_utf8_lossy(&delivery.body).into_owned();
                tracing::info!(queue = %route.queue, "received raw message");

                match format_payload(&text) {
                    Some(payload) => {
                        post_payload(&client, &route.url, payload).await;
                        // Acked after the attempt, successful or not.
                        if let Err(e) = broker.ack(&route.queue, delivery.delivery_tag).await {
                            tracing::error!(error = %e, "failed to acknowledge delivery");
                        }
                    }
                    None => {
                        // Unrecognized payloads stay unacknowledged.
                        tracing::error!(
                            queue = %route.queue,
                            "message is neither valid JSON nor XML"
                        );
                    }
                }
            }
        }
    }
}

/// Normalizes a payload for forwarding.
///
/// JSON is re-serialized pretty-printed; well-formed XML passes through
/// unchanged; anything else is rejected with `None`.
pub fn format_payload(text: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        return serde_json::to_string_pretty(&value).ok();
    }
    if looks_like_xml(text) && xml_to_json(text).is_ok() {
        return Some(text.to_owned());
    }
    None
}

async fn post_payload(client: &reqwest::Client, url: &str, payload: String) {
    let result = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(payload)
        .send()
        .await;
    match result {
        Ok(response) if response.status().is_success() => {
            tracing::info!(%url, "message forwarded");
        }
        Ok(response) => {
            tracing::error!(%url, status = %response.status(), "forward rejected");
        }
        Err(e) => {
            tracing::error!(%url, error = %e, "forward failed");
        }
    }
}
