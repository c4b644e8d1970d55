//! In-process feed.
//!
//! Used to inject pushes from another component of the same process (and by
//! the tests). Publishing never blocks: a subscriber whose buffer is full
//! misses that push.

use crate::feed::{FeedError, FeedSubscription, SensorFeed};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

const DEFAULT_CAPACITY: usize = 64;

/// A feed whose pushes come from [`MemoryFeed::publish`].
pub struct MemoryFeed {
    capacity: usize,
    subscribers: Mutex<Vec<(String, mpsc::Sender<serde_json::Value>)>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Deliver a payload to every live subscriber of `path`.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, path: &str, payload: serde_json::Value) -> usize {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|(_, sender)| !sender.is_closed());

        let mut delivered = 0;
        for (_, sender) in subscribers.iter().filter(|(p, _)| p == path) {
            match sender.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(path, "Feed subscriber is lagging, push dropped");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Number of live subscribers on `path`.
    pub fn subscriber_count(&self, path: &str) -> usize {
        let subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers
            .iter()
            .filter(|(p, sender)| p == path && !sender.is_closed())
            .count()
    }
}

impl Default for MemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorFeed for MemoryFeed {
    fn subscribe(&self, path: &str) -> Result<FeedSubscription, FeedError> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.push((path.to_string(), sender));
        Ok(FeedSubscription::new(path, receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_matching_path_only() {
        let feed = MemoryFeed::new();
        let mut a = feed.subscribe("/sensors/a").unwrap();
        let _b = feed.subscribe("/sensors/b").unwrap();

        assert_eq!(feed.publish("/sensors/a", json!({"n": 1})), 1);
        assert_eq!(a.next().await, Some(json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let feed = MemoryFeed::new();
        let mut sub = feed.subscribe("/sensors/a").unwrap();
        assert_eq!(feed.subscriber_count("/sensors/a"), 1);

        sub.unsubscribe();
        assert_eq!(feed.subscriber_count("/sensors/a"), 0);
        assert_eq!(feed.publish("/sensors/a", json!({})), 0);
        assert_eq!(sub.next().await, None);
    }
}
