//! Pub/Sub fan-out for bean change events (§4.4). Each subscriber gets its
//! own bounded channel; delivery never blocks the publisher — a full
//! buffer means the batch is dropped for that one subscriber.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};

use beans_core::BeanId;

const SUBSCRIBER_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeanEvent {
    Created(BeanId),
    Updated(BeanId),
    Deleted(BeanId),
}

pub type EventBatch = Vec<BeanEvent>;

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, SyncSender<EventBatch>>>,
}

/// The subscriber registry. Cheap to clone — internally an `Arc`.
#[derive(Clone, Default)]
pub struct Hub(Arc<Inner>);

/// Revokes a subscription on drop-free demand. Calling `unsubscribe` more
/// than once, or after the hub has been closed, is a no-op.
pub struct Subscription {
    id: u64,
    hub: Arc<Inner>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        self.hub.subscribers.lock().expect("pubsub lock poisoned").remove(&self.id);
    }
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        Hub::default()
    }

    /// Register a new subscriber. Returns its receiver and a handle to
    /// unsubscribe.
    pub fn subscribe(&self) -> (Receiver<EventBatch>, Subscription) {
        let (tx, rx) = sync_channel(SUBSCRIBER_BUFFER);
        let id = self.0.next_id.fetch_add(1, Ordering::SeqCst);
        self.0
            .subscribers
            .lock()
            .expect("pubsub lock poisoned")
            .insert(id, tx);
        (
            rx,
            Subscription {
                id,
                hub: Arc::clone(&self.0),
            },
        )
    }

    /// Fan a batch out to every live subscriber. A subscriber whose buffer
    /// is full simply misses this batch; a disconnected subscriber is
    /// pruned from the registry.
    pub fn publish(&self, batch: EventBatch) {
        if batch.is_empty() {
            return;
        }
        let mut subscribers = self.0.subscribers.lock().expect("pubsub lock poisoned");
        subscribers.retain(|_, tx| match tx.try_send(batch.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Drop every subscriber's sender, closing their receivers.
    pub fn close(&self) {
        self.0.subscribers.lock().expect("pubsub lock poisoned").clear();
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.lock().expect("pubsub lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beans_core::BeanId;
    use std::time::Duration;

    fn id(s: &str) -> BeanId {
        BeanId::parse(s).unwrap()
    }

    #[test]
    fn subscriber_receives_published_batch() {
        let hub = Hub::new();
        let (rx, _sub) = hub.subscribe();
        hub.publish(vec![BeanEvent::Created(id("beans-aaaa"))]);
        let batch = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(batch, vec![BeanEvent::Created(id("beans-aaaa"))]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let hub = Hub::new();
        let (_rx, sub) = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn slow_subscriber_drops_rather_than_blocks() {
        let hub = Hub::new();
        let (_rx, _sub) = hub.subscribe();
        for i in 0..32 {
            hub.publish(vec![BeanEvent::Updated(id(&format!("beans-{i:04}")))]);
        }
        // No panic, no deadlock: the full buffer silently drops overflow.
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn empty_batch_is_not_published() {
        let hub = Hub::new();
        let (rx, _sub) = hub.subscribe();
        hub.publish(vec![]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_disconnects_all_subscribers() {
        let hub = Hub::new();
        let (rx, _sub) = hub.subscribe();
        hub.close();
        assert!(rx.recv().is_err());
    }

    #[test]
    fn two_subscribers_each_get_their_own_copy() {
        let hub = Hub::new();
        let (rx_a, _a) = hub.subscribe();
        let (rx_b, _b) = hub.subscribe();
        hub.publish(vec![BeanEvent::Deleted(id("beans-zzzz"))]);
        assert!(rx_a.recv_timeout(Duration::from_millis(100)).is_ok());
        assert!(rx_b.recv_timeout(Duration::from_millis(100)).is_ok());
    }
}
