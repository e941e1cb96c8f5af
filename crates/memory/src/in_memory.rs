//! In-memory history — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use ratchet_core::error::HistoryError;
use ratchet_core::history::{HistoryStore, TurnRecord};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// A history store that keeps completed turns in a bounded deque.
///
/// When `max_records` is reached the oldest record is evicted on append.
/// `context_for` is deterministic: same stored records, same view.
pub struct InMemoryHistory {
    records: RwLock<VecDeque<TurnRecord>>,
    max_records: usize,
}

impl InMemoryHistory {
    /// Unbounded in practice (capped at a large ceiling).
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Keep at most `max_records` completed turns.
    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, record: TurnRecord) -> Result<(), HistoryError> {
        let mut records = self.records.write().await;
        if records.len() >= self.max_records {
            records.pop_front();
            tracing::debug!("History at capacity, evicted oldest record");
        }
        records.push_back(record);
        Ok(())
    }

    async fn context_for(&self, window: usize) -> Result<Vec<TurnRecord>, HistoryError> {
        let records = self.records.read().await;
        let skip = records.len().saturating_sub(window);
        Ok(records.iter().skip(skip).cloned().collect())
    }

    async fn len(&self) -> Result<usize, HistoryError> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        self.records.write().await.clear();
        Ok(())
    }
}
