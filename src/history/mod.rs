//! Pressure history: the store seam, two stores, the pruner and the trend
//! analyzer.
//!
//! The history is an ordered log of pressure readings appended by the
//! upstream writer (one per hour on the device side). Keys grow
//! monotonically, so key order is chronological order.

pub mod analyzer;
pub mod file;
pub mod memory;
pub mod pruner;

pub use analyzer::{classify_pressure_change, PressureTrendAnalyzer};
pub use file::FileHistoryStore;
pub use memory::MemoryHistoryStore;
pub use pruner::HistoryPruner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chronological record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryKey(pub u64);

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stored pressure reading (hPa).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureHistoryRecord {
    pub key: HistoryKey,
    pub pressure: f64,
}

/// Errors from a history store or from pruning.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history file is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("history store unavailable: {0}")]
    Unavailable(String),
    #[error("prune incomplete: {deleted} deleted, {failed} failed")]
    PartialPrune { deleted: usize, failed: usize },
}

/// Ordered key-value log of pressure readings.
///
/// Range queries return records in ascending key order. Deleting a key that
/// no longer exists succeeds.
#[async_trait]
pub trait PressureHistoryStore: Send + Sync {
    async fn count(&self) -> Result<usize, HistoryError>;

    /// The `limit` oldest records.
    async fn first(&self, limit: usize) -> Result<Vec<PressureHistoryRecord>, HistoryError>;

    /// The `limit` most recent records, oldest first.
    async fn last(&self, limit: usize) -> Result<Vec<PressureHistoryRecord>, HistoryError>;

    async fn delete(&self, key: HistoryKey) -> Result<(), HistoryError>;

    /// Append a reading under a fresh key greater than every existing key.
    async fn append(&self, pressure: f64) -> Result<HistoryKey, HistoryError>;
}
