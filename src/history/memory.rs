//! In-memory history store.

use super::{HistoryError, HistoryKey, PressureHistoryRecord, PressureHistoryStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<HistoryKey, f64>,
    next_key: u64,
}

/// History kept in a `BTreeMap`, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    inner: Mutex<Inner>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with readings, oldest first.
    pub fn with_readings(readings: impl IntoIterator<Item = f64>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for pressure in readings {
                let key = HistoryKey(inner.next_key);
                inner.next_key += 1;
                inner.records.insert(key, pressure);
            }
        }
        store
    }

    /// All keys in chronological order.
    pub fn keys(&self) -> Vec<HistoryKey> {
        self.lock().records.keys().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn to_record((key, pressure): (&HistoryKey, &f64)) -> PressureHistoryRecord {
    PressureHistoryRecord {
        key: *key,
        pressure: *pressure,
    }
}

#[async_trait]
impl PressureHistoryStore for MemoryHistoryStore {
    async fn count(&self) -> Result<usize, HistoryError> {
        Ok(self.lock().records.len())
    }

    async fn first(&self, limit: usize) -> Result<Vec<PressureHistoryRecord>, HistoryError> {
        Ok(self.lock().records.iter().take(limit).map(to_record).collect())
    }

    async fn last(&self, limit: usize) -> Result<Vec<PressureHistoryRecord>, HistoryError> {
        let inner = self.lock();
        let mut records: Vec<_> = inner.records.iter().rev().take(limit).map(to_record).collect();
        records.reverse();
        Ok(records)
    }

    async fn delete(&self, key: HistoryKey) -> Result<(), HistoryError> {
        self.lock().records.remove(&key);
        Ok(())
    }

    async fn append(&self, pressure: f64) -> Result<HistoryKey, HistoryError> {
        let mut inner = self.lock();
        let key = HistoryKey(inner.next_key);
        inner.next_key += 1;
        inner.records.insert(key, pressure);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_range_queries_are_ascending() {
        let store = MemoryHistoryStore::with_readings([1001.0, 1002.0, 1003.0, 1004.0]);

        let first: Vec<f64> = store.first(2).await.unwrap().iter().map(|r| r.pressure).collect();
        assert_eq!(first, vec![1001.0, 1002.0]);

        let last: Vec<f64> = store.last(3).await.unwrap().iter().map(|r| r.pressure).collect();
        assert_eq!(last, vec![1002.0, 1003.0, 1004.0]);

        assert_eq!(store.last(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_append_and_delete() {
        let store = MemoryHistoryStore::new();
        let a = store.append(1000.0).await.unwrap();
        let b = store.append(999.5).await.unwrap();
        assert!(a < b);
        assert_eq!(store.count().await.unwrap(), 2);

        store.delete(a).await.unwrap();
        store.delete(a).await.unwrap();
        assert_eq!(store.keys(), vec![b]);
    }
}
