//! Conversation history — the cross-turn store of completed turns.
//!
//! Only turns that reached `Done` are appended; an exhausted or cancelled
//! turn produced no committed answer and leaves history untouched. Backends
//! (in-memory, file, relational) implement `HistoryStore`; windowing beyond
//! "most recent N" and summarization belong to the backend, not the loop.

use crate::error::HistoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed (input, final output) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    /// The turn's user input.
    pub input: String,

    /// The committed final output.
    pub output: serde_json::Value,

    /// When the turn completed.
    pub completed_at: DateTime<Utc>,
}

impl TurnRecord {
    pub fn new(input: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            input: input.into(),
            output,
            completed_at: Utc::now(),
        }
    }
}

/// A cross-turn store of completed turns, owned by one session.
///
/// `context_for` must be deterministic for a given store state: same state,
/// same window, same records in the same order.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// A human-readable name for this backend (e.g. "in_memory", "noop").
    fn name(&self) -> &str;

    /// Append a completed turn. Called at most once per turn, after `Done`.
    async fn append(&self, record: TurnRecord) -> std::result::Result<(), HistoryError>;

    /// The most recent `window` records, oldest first.
    async fn context_for(
        &self,
        window: usize,
    ) -> std::result::Result<Vec<TurnRecord>, HistoryError>;

    /// Number of stored records.
    async fn len(&self) -> std::result::Result<usize, HistoryError>;

    /// Remove all records.
    async fn clear(&self) -> std::result::Result<(), HistoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serialization_roundtrip() {
        let record = TurnRecord::new("what is 10 + 10?", serde_json::json!({"answer": "20"}));
        let json = serde_json::to_string(&record).unwrap();
        let back: TurnRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.input, "what is 10 + 10?");
        assert_eq!(back.output["answer"], "20");
    }
}
