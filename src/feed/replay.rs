//! File replay feed.
//!
//! Reads a JSON Lines file (one sensor payload per line) and pushes the
//! payloads at a fixed pace. Blank lines are skipped; lines that are not
//! JSON are forwarded as strings so the consumer's parser rejects them the
//! same way it rejects any other malformed push.

use crate::feed::{FeedError, FeedSubscription, SensorFeed};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Replays recorded sensor pushes from disk.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    path: PathBuf,
    interval: Duration,
    repeat: bool,
    restamp: bool,
}

impl ReplayFeed {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            repeat: false,
            restamp: false,
        }
    }

    /// Start again from the first line after the last one.
    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// Rewrite `current.timestamp_ms` to the replay time so the sensor
    /// appears online.
    pub fn restamp(mut self, restamp: bool) -> Self {
        self.restamp = restamp;
        self
    }

    fn parse_lines(content: &str) -> Vec<serde_json::Value> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .unwrap_or_else(|_| serde_json::Value::String(line.to_string()))
            })
            .collect()
    }
}

impl SensorFeed for ReplayFeed {
    fn subscribe(&self, path: &str) -> Result<FeedSubscription, FeedError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| FeedError::Io(format!("{}: {e}", self.path.display())))?;
        let payloads = Self::parse_lines(&content);

        tracing::info!(
            path,
            file = %self.path.display(),
            payloads = payloads.len(),
            "Replaying recorded sensor feed"
        );

        let (sender, receiver) = mpsc::channel(1);
        let interval = self.interval;
        let repeat = self.repeat;
        let restamp = self.restamp;

        tokio::spawn(async move {
            if payloads.is_empty() {
                return;
            }
            loop {
                for payload in &payloads {
                    let mut payload = payload.clone();
                    if restamp {
                        if let Some(current) = payload.get_mut("current") {
                            if let Some(obj) = current.as_object_mut() {
                                obj.insert(
                                    "timestamp_ms".to_string(),
                                    serde_json::json!(Utc::now().timestamp_millis()),
                                );
                            }
                        }
                    }
                    if sender.send(payload).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(interval).await;
                }
                if !repeat {
                    break;
                }
            }
        });

        Ok(FeedSubscription::new(path, receiver))
    }
}
