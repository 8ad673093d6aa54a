//! Background vectorization queue (C3).
//!
//! Ingestion never blocks on embeddings: [`VectorizeQueue::enqueue`] is a
//! constant-time push behind a `std::sync::Mutex`, and a single worker —
//! driven by [`VectorizeQueue::run_once`] on a timer or idle trigger —
//! does the actual embedding work.

use crate::embeddings::EmbeddingClient;
use crate::model::PendingVectorize;
use crate::search::VectorIndex;
use crate::storage::Store;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_PROCESS_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
const HIGH_PRIORITY_THRESHOLD: f32 = 0.7;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VectorizeError {
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
    #[error(transparent)]
    VectorSearch(#[from] crate::search::VectorSearchError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, VectorizeError>;

/// `(pending_count, dead_letter_count, oldest_enqueued_age_seconds)` —
/// observability consumers decide when this is worth a warning.
#[derive(Debug, Clone, Copy)]
pub struct QueueHealth {
    pub pending_count: usize,
    pub dead_letter_count: usize,
    pub oldest_enqueued_age_seconds: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueSnapshot {
    high: VecDeque<PendingVectorize>,
    normal: VecDeque<PendingVectorize>,
    dead_letter: Vec<PendingVectorize>,
}

struct Lanes {
    high: VecDeque<PendingVectorize>,
    normal: VecDeque<PendingVectorize>,
    dead_letter: Vec<PendingVectorize>,
}

pub struct VectorizeQueue {
    lanes: Mutex<Lanes>,
    batch_size: usize,
    max_retries: u32,
}

impl VectorizeQueue {
    pub fn new() -> Self {
        Self {
            lanes: Mutex::new(Lanes {
                high: VecDeque::new(),
                normal: VecDeque::new(),
                dead_letter: Vec::new(),
            }),
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Non-blocking; lane chosen by `item.is_high_priority()`.
    pub fn enqueue(&self, item: PendingVectorize) -> Result<()> {
        let mut lanes = self.lanes.lock().map_err(|_| VectorizeError::LockPoisoned)?;
        if item.is_high_priority() {
            lanes.high.push_back(item);
        } else {
            lanes.normal.push_back(item);
        }
        Ok(())
    }

    pub fn health(&self) -> Result<QueueHealth> {
        let lanes = self.lanes.lock().map_err(|_| VectorizeError::LockPoisoned)?;
        let oldest = lanes
            .high
            .iter()
            .chain(lanes.normal.iter())
            .map(|p| p.enqueued_at)
            .min()
            .map(|t| (chrono::Utc::now() - t).num_seconds());

        Ok(QueueHealth {
            pending_count: lanes.high.len() + lanes.normal.len(),
            dead_letter_count: lanes.dead_letter.len(),
            oldest_enqueued_age_seconds: oldest,
        })
    }

    /// Drain up to `batch_size` items — high lane first — embed them in
    /// one batch call, add each to the vector index, and mark the whole
    /// batch vectorized in a single `Store` transaction. Returns the
    /// number of items successfully processed.
    pub fn run_once(&self, store: &Store, vector_index: &mut VectorIndex, embedder: &dyn EmbeddingClient) -> Result<usize> {
        let batch = {
            let mut lanes = self.lanes.lock().map_err(|_| VectorizeError::LockPoisoned)?;
            let mut batch = Vec::with_capacity(self.batch_size);
            while batch.len() < self.batch_size {
                if let Some(item) = lanes.high.pop_front() {
                    batch.push(item);
                } else if let Some(item) = lanes.normal.pop_front() {
                    batch.push(item);
                } else {
                    break;
                }
            }
            batch
        };

        if batch.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = batch.iter().map(|p| p.content.as_str()).collect();
        match embedder.embed_batch(&texts) {
            Ok(vectors) => {
                let mut processed_ids = Vec::with_capacity(batch.len());
                for (item, vector) in batch.iter().zip(vectors.iter()) {
                    vector_index.add(&item.memory_id, vector)?;
                    processed_ids.push(item.memory_id.clone());
                }
                store.mark_vectorized_batch(&processed_ids)?;
                Ok(batch.len())
            }
            Err(err) => {
                tracing::warn!(error = %err, batch_size = batch.len(), "embedding batch failed, requeuing with backoff");
                self.requeue_with_backoff(batch)?;
                Ok(0)
            }
        }
    }

    fn requeue_with_backoff(&self, batch: Vec<PendingVectorize>) -> Result<()> {
        let mut lanes = self.lanes.lock().map_err(|_| VectorizeError::LockPoisoned)?;
        for mut item in batch {
            item.retry_count += 1;
            if item.retry_count >= self.max_retries {
                tracing::warn!(memory_id = %item.memory_id, retries = item.retry_count, "moving item to dead-letter queue");
                lanes.dead_letter.push(item);
            } else if item.is_high_priority() {
                lanes.high.push_back(item);
            } else {
                lanes.normal.push_back(item);
            }
        }
        Ok(())
    }

    /// Serialize both lanes plus the dead-letter list to `path`, in
    /// order, for crash-safe resume.
    pub fn save(&self, path: &Path) -> Result<()> {
        let lanes = self.lanes.lock().map_err(|_| VectorizeError::LockPoisoned)?;
        let snapshot = QueueSnapshot {
            high: lanes.high.clone(),
            normal: lanes.normal.clone(),
            dead_letter: lanes.dead_letter.clone(),
        };
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, serde_json::to_string(&snapshot)?)?;
        std::fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Load a previously saved snapshot, if present. A missing file is
    /// not an error — it means there was nothing pending at last shutdown.
    pub fn load(path: &Path) -> Result<Self> {
        let queue = Self::new();
        if !path.exists() {
            return Ok(queue);
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: QueueSnapshot = serde_json::from_str(&raw)?;
        let mut lanes = queue.lanes.lock().map_err(|_| VectorizeError::LockPoisoned)?;
        lanes.high = snapshot.high;
        lanes.normal = snapshot.normal;
        lanes.dead_letter = snapshot.dead_letter;
        drop(lanes);
        Ok(queue)
    }
}

impl Default for VectorizeQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingClient;
    use crate::model::MemoryKind;
    use crate::search::vector::VectorIndexConfig;

    fn test_index() -> VectorIndex {
        VectorIndex::with_config(VectorIndexConfig { dimensions: 16, ..Default::default() }).unwrap()
    }

    #[test]
    fn high_priority_lane_drains_before_normal() {
        let queue = VectorizeQueue::new().with_batch_size(1);
        queue.enqueue(PendingVectorize::new("low", "low priority text", 0.2)).unwrap();
        queue.enqueue(PendingVectorize::new("high", "high priority text", 0.9)).unwrap();

        let store = Store::open_in_memory().unwrap();
        store.insert(crate::model::Memory::new("high priority text", MemoryKind::Fact, 0.9)).unwrap();
        let mut index = test_index();
        let embedder = MockEmbeddingClient::new(16);

        let processed = queue.run_once(&store, &mut index, &embedder).unwrap();
        assert_eq!(processed, 1);
        assert!(index.contains("high"));
        assert!(!index.contains("low"));
    }

    #[test]
    fn run_once_on_empty_queue_is_a_no_op() {
        let queue = VectorizeQueue::new();
        let store = Store::open_in_memory().unwrap();
        let mut index = test_index();
        let embedder = MockEmbeddingClient::new(16);
        assert_eq!(queue.run_once(&store, &mut index, &embedder).unwrap(), 0);
    }

    #[test]
    fn save_then_load_preserves_lane_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");

        let queue = VectorizeQueue::new();
        queue.enqueue(PendingVectorize::new("a", "content a", 0.9)).unwrap();
        queue.enqueue(PendingVectorize::new("b", "content b", 0.2)).unwrap();
        queue.save(&path).unwrap();

        let loaded = VectorizeQueue::load(&path).unwrap();
        let health = loaded.health().unwrap();
        assert_eq!(health.pending_count, 2);
    }

    #[test]
    fn load_of_missing_file_yields_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let loaded = VectorizeQueue::load(&path).unwrap();
        assert_eq!(loaded.health().unwrap().pending_count, 0);
    }

    #[test]
    fn health_reports_dead_letter_count_after_exhausted_retries() {
        let queue = VectorizeQueue::new().with_batch_size(1);
        queue.enqueue(PendingVectorize::new("mem-1", "text", 0.9)).unwrap();

        struct FailingEmbedder;
        impl EmbeddingClient for FailingEmbedder {
            fn embed(&self, _text: &str) -> crate::embeddings::Result<Vec<f32>> {
                Err(crate::embeddings::EmbeddingError::EmbeddingFailed("boom".into()))
            }
            fn dimensions(&self) -> usize {
                16
            }
        }

        let store = Store::open_in_memory().unwrap();
        let mut index = test_index();
        let embedder = FailingEmbedder;

        for _ in 0..DEFAULT_MAX_RETRIES {
            queue.run_once(&store, &mut index, &embedder).unwrap();
        }

        let health = queue.health().unwrap();
        assert_eq!(health.dead_letter_count, 1);
        assert_eq!(health.pending_count, 0);
    }
}
