//! Feed manager: fans discrete issue events out to subscribers.

use crate::error::{FeedError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::warn;

use super::types::{IssueEvent, SubscriptionConfig, SubscriptionId};

struct FeedInner {
    /// Active subscribers by id.
    subscribers: RwLock<HashMap<SubscriptionId, Sender<IssueEvent>>>,
    /// Counter for generating subscription ids.
    next_id: AtomicU64,
}

/// Broadcasts issue events to any number of subscriptions.
///
/// A subscription only sees events emitted after it was created. Delivery
/// order per subscriber matches emission order; there is no ordering
/// guarantee across subscribers.
pub struct FeedManager {
    inner: Arc<FeedInner>,
}

impl FeedManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a new subscription.
    ///
    /// The returned handle is the single consumer of its event sequence and
    /// unregisters itself when dropped.
    pub fn subscribe(&self, config: SubscriptionConfig) -> IssueSubscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size);

        self.inner.subscribers.write().insert(id, sender);

        IssueSubscription {
            id,
            receiver,
            feed: Arc::downgrade(&self.inner),
        }
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Deliver an event to every subscriber. Subscribers whose buffer is
    /// full or whose receiver is gone are removed; their channel closing is
    /// the terminal failure the consumer observes.
    pub fn broadcast(&self, event: IssueEvent) {
        let mut to_remove = Vec::new();

        {
            let subscribers = self.inner.subscribers.read();
            for (id, sender) in subscribers.iter() {
                if sender.try_send(event.clone()).is_err() {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subscribers = self.inner.subscribers.write();
            for id in to_remove {
                warn!(subscription = id.0, "dropping unresponsive feed subscriber");
                subscribers.remove(&id);
            }
        }
    }
}

impl Default for FeedManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a live issue subscription.
///
/// Consume with [`recv`](Self::recv) (blocking), [`try_recv`](Self::try_recv),
/// [`recv_timeout`](Self::recv_timeout), or as an [`Iterator`]. Dropping the
/// handle unregisters the subscriber synchronously.
pub struct IssueSubscription {
    id: SubscriptionId,
    receiver: Receiver<IssueEvent>,
    feed: Weak<FeedInner>,
}

impl IssueSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next event, blocking until one arrives.
    ///
    /// [`FeedError::FeedClosed`] is the terminal failure: the subscriber was
    /// dropped for falling behind, or the feed itself is gone.
    pub fn recv(&self) -> Result<IssueEvent> {
        self.receiver.recv().map_err(|_| FeedError::FeedClosed)
    }

    /// Receive without blocking. `Ok(None)` means no event is ready.
    pub fn try_recv(&self) -> Result<Option<IssueEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(crossbeam_channel::TryRecvError::Empty) => Ok(None),
            Err(crossbeam_channel::TryRecvError::Disconnected) => Err(FeedError::FeedClosed),
        }
    }

    /// Receive with a caller-imposed bound on the wait. `Ok(None)` means the
    /// timeout elapsed with the feed still open.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<IssueEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(FeedError::FeedClosed),
        }
    }
}

impl Iterator for IssueSubscription {
    type Item = IssueEvent;

    fn next(&mut self) -> Option<IssueEvent> {
        self.receiver.recv().ok()
    }
}

impl Drop for IssueSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.feed.upgrade() {
            inner.subscribers.write().remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::types::IssueEventKind;
    use crate::types::{MessageId, MessageRecord, MessageTag};
    use serde_json::json;

    fn event(kind: IssueEventKind, id: u64) -> IssueEvent {
        IssueEvent {
            kind,
            node: MessageRecord::new(MessageId(id), MessageTag::Issue, json!({})),
        }
    }

    #[test]
    fn test_subscriber_receives_in_emission_order() {
        let feed = FeedManager::new();
        let subscription = feed.subscribe(SubscriptionConfig::default());

        feed.broadcast(event(IssueEventKind::Added, 1));
        feed.broadcast(event(IssueEventKind::Deleted, 1));

        assert_eq!(
            subscription
                .recv_timeout(Duration::from_millis(100))
                .unwrap()
                .unwrap()
                .kind,
            IssueEventKind::Added
        );
        assert_eq!(
            subscription
                .recv_timeout(Duration::from_millis(100))
                .unwrap()
                .unwrap()
                .kind,
            IssueEventKind::Deleted
        );
    }

    #[test]
    fn test_drop_unregisters_synchronously() {
        let feed = FeedManager::new();
        let subscription = feed.subscribe(SubscriptionConfig::default());
        assert_eq!(feed.subscription_count(), 1);

        drop(subscription);
        assert_eq!(feed.subscription_count(), 0);
    }

    #[test]
    fn test_cancelled_subscriber_does_not_affect_others() {
        let feed = FeedManager::new();
        let first = feed.subscribe(SubscriptionConfig::default());
        let second = feed.subscribe(SubscriptionConfig::default());

        feed.broadcast(event(IssueEventKind::Added, 1));
        assert!(first
            .recv_timeout(Duration::from_millis(100))
            .unwrap()
            .is_some());
        drop(first);

        feed.broadcast(event(IssueEventKind::Deleted, 1));
        let delivered = second
            .recv_timeout(Duration::from_millis(100))
            .unwrap()
            .unwrap();
        assert_eq!(delivered.kind, IssueEventKind::Added);
        let delivered = second
            .recv_timeout(Duration::from_millis(100))
            .unwrap()
            .unwrap();
        assert_eq!(delivered.kind, IssueEventKind::Deleted);
    }

    #[test]
    fn test_slow_subscriber_dropped() {
        let feed = FeedManager::new();
        let subscription = feed.subscribe(SubscriptionConfig { buffer_size: 2 });

        for i in 0..10 {
            feed.broadcast(event(IssueEventKind::Added, i));
        }

        assert_eq!(feed.subscription_count(), 0);
        // Buffered events drain, then the closed feed is terminal.
        assert!(subscription.recv().is_ok());
        assert!(subscription.recv().is_ok());
        assert!(matches!(subscription.recv(), Err(FeedError::FeedClosed)));
    }

    #[test]
    fn test_new_subscription_sees_only_future_events() {
        let feed = FeedManager::new();
        feed.broadcast(event(IssueEventKind::Added, 1));

        let subscription = feed.subscribe(SubscriptionConfig::default());
        assert!(subscription.try_recv().unwrap().is_none());
    }
}
