use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use filegate_protocol::{EnrichedMessage, HEADER_EXTENSION, HEADER_MESSAGE_ID, QueueBinding};
use filegate_transform::prepare_content;

use crate::{BrokerClient, BrokerError, QueueOptions};

/// Publishes relay messages through the route table.
///
/// Resolves the logical destination tag, runs the content transform for text
/// payloads, wraps the result in an [`EnrichedMessage`], declares the
/// destination queue durable and publishes. An unresolved tag is logged and
/// dropped rather than surfaced as an error.
pub struct Publisher<B: BrokerClient> {
    broker: Arc<B>,
    binding: QueueBinding,
}

impl<B: BrokerClient> Publisher<B> {
    pub fn new(broker: Arc<B>, binding: QueueBinding) -> Self {
        Self { broker, binding }
    }

    pub fn binding(&self) -> &QueueBinding {
        &self.binding
    }

    /// Publishes a text payload under `tag`.
    ///
    /// XML-looking content is converted to JSON first; malformed XML degrades
    /// into an error envelope, so the publish always carries some payload.
    pub async fn publish_text(&self, tag: &str, content: &str) -> Result<(), BrokerError> {
        let Some(queue) = self.binding.resolve(tag) else {
            tracing::warn!(%tag, "no queue bound for tag, dropping message");
            return Ok(());
        };

        let message = EnrichedMessage::new(tag, prepare_content(content));
        let body = message.to_bytes()?;

        self.broker.declare_queue(queue, QueueOptions::default()).await?;
        self.broker.publish(queue, &body, HashMap::new()).await?;
        tracing::info!(id = %message.id, %tag, %queue, "message published");
        Ok(())
    }

    /// Publishes a binary file payload under `tag`.
    ///
    /// Bypasses the text transform entirely; the original file extension
    /// travels as a message header alongside a generated id.
    pub async fn publish_file(
        &self,
        tag: &str,
        payload: &[u8],
        extension: &str,
    ) -> Result<(), BrokerError> {
        let Some(queue) = self.binding.resolve(tag) else {
            tracing::warn!(%tag, "no queue bound for tag, dropping file");
            return Ok(());
        };

        let id = Uuid::new_v4();
        let mut headers = HashMap::new();
        headers.insert(HEADER_MESSAGE_ID.to_owned(), id.to_string());
        headers.insert(HEADER_EXTENSION.to_owned(), extension.to_owned());

        self.broker.declare_queue(queue, QueueOptions::default()).await?;
        self.broker.publish(queue, payload, headers).await?;
        tracing::info!(%id, %tag, %queue, size = payload.len(), "file published");
        Ok(())
    }
}
