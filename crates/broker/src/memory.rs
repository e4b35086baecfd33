use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use filegate_protocol::Delivery;

use crate::{BrokerClient, BrokerError, QueueOptions};

#[derive(Default)]
struct QueueState {
    declared: Option<QueueOptions>,
    /// Messages waiting for a subscriber.
    ready: VecDeque<Delivery>,
    /// Delivered but not yet acknowledged, keyed by delivery tag.
    unacked: HashMap<u64, Delivery>,
    subscriber: Option<mpsc::UnboundedSender<Delivery>>,
}

/// In-process broker with durable-queue semantics.
///
/// One subscriber per queue; deliveries move to the unacked set when handed
/// out and are redelivered to the next subscriber if never acknowledged.
#[derive(Default)]
pub struct MemoryBroker {
    queues: Mutex<HashMap<String, QueueState>>,
    next_tag: AtomicU64,
    fail_publish: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail until cleared.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Messages currently held by `queue` (ready + unacknowledged).
    pub async fn message_count(&self, queue: &str) -> usize {
        let queues = self.queues.lock().await;
        queues
            .get(queue)
            .map(|q| q.ready.len() + q.unacked.len())
            .unwrap_or(0)
    }

    /// Messages held across all queues.
    pub async fn total_messages(&self) -> usize {
        let queues = self.queues.lock().await;
        queues
            .values()
            .map(|q| q.ready.len() + q.unacked.len())
            .sum()
    }

    /// Unacknowledged deliveries on `queue`.
    pub async fn unacked_count(&self, queue: &str) -> usize {
        let queues = self.queues.lock().await;
        queues.get(queue).map(|q| q.unacked.len()).unwrap_or(0)
    }

    /// Returns the names of queues that have been declared.
    pub async fn declared_queues(&self) -> Vec<String> {
        let queues = self.queues.lock().await;
        let mut names: Vec<String> = queues
            .iter()
            .filter(|(_, q)| q.declared.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn next_delivery_tag(&self) -> u64 {
        self.next_tag.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl BrokerClient for MemoryBroker {
    async fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<(), BrokerError> {
        let mut queues = self.queues.lock().await;
        let state = queues.entry(name.to_owned()).or_default();
        // Idempotent: redeclaration keeps the original options.
        state.declared.get_or_insert(options);
        Ok(())
    }

    async fn publish(
        &self,
        queue: &str,
        body: &[u8],
        headers: HashMap<String, String>,
    ) -> Result<(), BrokerError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable("publish refused".into()));
        }
        let mut queues = self.queues.lock().await;
        let state = queues.entry(queue.to_owned()).or_default();
        let delivery = Delivery {
            body: body.to_vec(),
            headers,
            delivery_tag: self.next_delivery_tag(),
        };
        match &state.subscriber {
            Some(tx) if !tx.is_closed() => {
                state.unacked.insert(delivery.delivery_tag, delivery.clone());
                // Receiver can only be gone if it raced the is_closed check;
                // the unacked entry keeps the message either way.
                let _ = tx.send(delivery);
            }
            _ => {
                state.subscriber = None;
                state.ready.push_back(delivery);
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
    ) -> Result<mpsc::UnboundedReceiver<Delivery>, BrokerError> {
        let mut queues = self.queues.lock().await;
        let state = queues.entry(queue.to_owned()).or_default();
        let (tx, rx) = mpsc::unbounded_channel();

        // Redeliver anything a previous subscriber left unacknowledged,
        // oldest delivery tag first, then drain the ready backlog.
        let mut pending: Vec<Delivery> = state.unacked.values().cloned().collect();
        pending.sort_by_key(|d| d.delivery_tag);
        for delivery in pending {
            let _ = tx.send(delivery);
        }
        while let Some(delivery) = state.ready.pop_front() {
            state.unacked.insert(delivery.delivery_tag, delivery.clone());
            let _ = tx.send(delivery);
        }

        state.subscriber = Some(tx);
        Ok(rx)
    }

    async fn ack(&self, queue: &str, delivery_tag: u64) -> Result<(), BrokerError> {
        let mut queues = self.queues.lock().await;
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::UnknownQueue(queue.to_owned()))?;
        state.unacked.remove(&delivery_tag);
        Ok(())
    }
}
