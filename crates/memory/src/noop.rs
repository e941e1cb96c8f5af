//! No-op history — discards everything. For stateless runs and tests that
//! must observe an untouched history.

use async_trait::async_trait;
use ratchet_core::error::HistoryError;
use ratchet_core::history::{HistoryStore, TurnRecord};

/// A history store that accepts appends and remembers nothing.
#[derive(Debug, Default)]
pub struct NoopHistory;

impl NoopHistory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HistoryStore for NoopHistory {
    fn name(&self) -> &str {
        "noop"
    }

    async fn append(&self, _record: TurnRecord) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn context_for(&self, _window: usize) -> Result<Vec<TurnRecord>, HistoryError> {
        Ok(Vec::new())
    }

    async fn len(&self) -> Result<usize, HistoryError> {
        Ok(0)
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        Ok(())
    }
}
