//! JSON-file history store.
//!
//! The whole log lives in one small JSON document (the retention limit keeps
//! it to a few dozen records). Every operation reads the file, applies the
//! change and writes it back through a temporary file and a rename, under a
//! lock so concurrent deletes from the pruner do not lose updates.

use super::{HistoryError, HistoryKey, PressureHistoryRecord, PressureHistoryStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File name used under the data directory.
pub const HISTORY_FILE_NAME: &str = "pressure_history.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryDocument {
    next_key: u64,
    records: Vec<PressureHistoryRecord>,
}

/// History persisted to a JSON file.
pub struct FileHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `<dir>/pressure_history.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(HISTORY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HistoryDocument, HistoryError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let mut doc: HistoryDocument = serde_json::from_str(&contents)?;
                doc.records.sort_by_key(|r| r.key);
                Ok(doc)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HistoryDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, doc: &HistoryDocument) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PressureHistoryStore for FileHistoryStore {
    async fn count(&self) -> Result<usize, HistoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.records.len())
    }

    async fn first(&self, limit: usize) -> Result<Vec<PressureHistoryRecord>, HistoryError> {
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;
        Ok(doc.records.into_iter().take(limit).collect())
    }

    async fn last(&self, limit: usize) -> Result<Vec<PressureHistoryRecord>, HistoryError> {
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;
        let skip = doc.records.len().saturating_sub(limit);
        Ok(doc.records.into_iter().skip(skip).collect())
    }

    async fn delete(&self, key: HistoryKey) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        let before = doc.records.len();
        doc.records.retain(|r| r.key != key);
        if doc.records.len() != before {
            self.store(&doc).await?;
        }
        Ok(())
    }

    async fn append(&self, pressure: f64) -> Result<HistoryKey, HistoryError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        let newest = doc.records.last().map(|r| r.key.0 + 1).unwrap_or(0);
        let key = HistoryKey(doc.next_key.max(newest));
        doc.next_key = key.0 + 1;
        doc.records.push(PressureHistoryRecord { key, pressure });
        self.store(&doc).await?;
        Ok(key)
    }
}
