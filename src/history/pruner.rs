//! Bounds the pressure history to a retention limit.

use super::{HistoryError, PressureHistoryStore};
use crate::stats::SharedSessionStats;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Deletes the oldest records beyond a retention limit.
///
/// Deletes are independent and not atomic as a group: if some fail, the
/// ones that succeeded stay deleted and the next call finishes the job.
pub struct HistoryPruner {
    store: Arc<dyn PressureHistoryStore>,
    gate: Mutex<()>,
    stats: Option<SharedSessionStats>,
}

impl HistoryPruner {
    pub fn new(store: Arc<dyn PressureHistoryStore>) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: SharedSessionStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Delete the `total - limit` oldest records. Returns how many were
    /// deleted; zero when the history is already within the limit.
    pub async fn prune(&self, limit: usize) -> Result<usize, HistoryError> {
        let _gate = self.gate.lock().await;

        let total = self.store.count().await?;
        if total <= limit {
            tracing::debug!(total, limit, "Pressure history within limit");
            return Ok(0);
        }

        let excess = total - limit;
        let oldest = self.store.first(excess).await?;
        tracing::info!(total, limit, excess, "Pruning pressure history");

        let mut deletes = JoinSet::new();
        for record in oldest.into_iter().take(excess) {
            let store = Arc::clone(&self.store);
            deletes.spawn(async move { store.delete(record.key).await });
        }

        let mut deleted = 0;
        let mut failed = 0;
        while let Some(joined) = deletes.join_next().await {
            match joined {
                Ok(Ok(())) => deleted += 1,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Failed to delete history record");
                    failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "History delete task failed");
                    failed += 1;
                }
            }
        }

        if let Some(stats) = &self.stats {
            stats.record_records_pruned(deleted as u64);
        }

        if failed > 0 {
            return Err(HistoryError::PartialPrune { deleted, failed });
        }
        tracing::info!(deleted, "Pressure history pruned");
        Ok(deleted)
    }
}
