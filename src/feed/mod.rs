//! Live sensor feed.
//!
//! The feed is a publish/subscribe source keyed by path. Each emission is a
//! raw JSON payload holding a complete [`SensorSnapshot`]; parsing happens
//! on the consumer side so malformed pushes can be dropped and logged.

pub mod memory;
pub mod replay;
pub mod types;

use tokio::sync::mpsc;

pub use memory::MemoryFeed;
pub use replay::ReplayFeed;
pub use types::{DeviceStatus, Location, SensorReading, SensorSnapshot};

/// Feed path for a sensor identifier.
pub fn sensor_path(sensor_id: &str) -> String {
    format!("/sensors/{sensor_id}")
}

/// Errors raised by feed implementations and payload parsing.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed IO error: {0}")]
    Io(String),
    #[error("malformed sensor payload: {0}")]
    Malformed(String),
}

/// A source of sensor pushes.
pub trait SensorFeed: Send + Sync {
    /// Start listening on `path`. Dropping or unsubscribing the returned
    /// handle stops delivery.
    fn subscribe(&self, path: &str) -> Result<FeedSubscription, FeedError>;
}

/// An active listener on a feed path.
#[derive(Debug)]
pub struct FeedSubscription {
    path: String,
    receiver: mpsc::Receiver<serde_json::Value>,
}

impl FeedSubscription {
    pub fn new(path: impl Into<String>, receiver: mpsc::Receiver<serde_json::Value>) -> Self {
        Self {
            path: path.into(),
            receiver,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the next push. Returns `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<serde_json::Value> {
        self.receiver.recv().await
    }

    /// Stop receiving. Pushes already buffered are discarded.
    pub fn unsubscribe(&mut self) {
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}
