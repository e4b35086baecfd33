//! Message-broker capability for the filegate relay.
//!
//! [`BrokerClient`] abstracts a durable-queue publish/subscribe broker with
//! manual acknowledgment. [`MemoryBroker`] is the in-process implementation
//! used by tests and the demo daemon; [`Publisher`] layers the route table,
//! content transform and wire envelope on top of any client.

mod memory;
mod publisher;

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::mpsc;

use filegate_protocol::Delivery;

pub use memory::MemoryBroker;
pub use publisher::Publisher;

/// Errors produced by a broker client.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),
}

/// Declaration options for a queue.
///
/// Defaults match the relay's contract: durable, non-exclusive,
/// non-auto-delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            durable: true,
            exclusive: false,
            auto_delete: false,
        }
    }
}

/// Capability wrapper over a message broker.
///
/// A client handle is owned by a single loop; concurrent use of one handle
/// from several loops is not supported by real broker channels and is not
/// relied on here.
pub trait BrokerClient: Send + Sync {
    /// Declares a queue. Idempotent if the queue already exists.
    fn declare_queue(
        &self,
        name: &str,
        options: QueueOptions,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Publishes raw bytes to a queue with optional string headers.
    fn publish(
        &self,
        queue: &str,
        body: &[u8],
        headers: HashMap<String, String>,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Subscribes with manual acknowledgment.
    ///
    /// Deliveries not yet acknowledged when a subscriber goes away are
    /// redelivered to the next subscriber.
    fn subscribe(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<mpsc::UnboundedReceiver<Delivery>, BrokerError>> + Send;

    /// Acknowledges a delivery received from `queue`.
    fn ack(
        &self,
        queue: &str,
        delivery_tag: u64,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;
}
