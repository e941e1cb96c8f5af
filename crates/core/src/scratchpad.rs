//! The per-turn scratchpad and the turn it belongs to.
//!
//! The scratchpad is the turn's causal history: an append-only, ordered log
//! of dispatched actions and their results. The loop owns it exclusively for
//! the duration of one turn and resets it at turn boundaries.
//!
//! Invariant: `count(Result) <= count(Action) <= count(Result) + 1` at all
//! times — at most one action is outstanding awaiting its result.

use crate::decision::{Action, ActionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the scratchpad.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScratchpadEntry {
    Action(Action),
    Result(ActionResult),
}

/// Append-only record of (action, result) pairs for the current turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched action.
    pub fn record_action(&mut self, action: Action) {
        debug_assert!(
            self.outstanding_action().is_none(),
            "recorded an action while another is outstanding"
        );
        self.entries.push(ScratchpadEntry::Action(action));
    }

    /// Record the result answering the outstanding action.
    pub fn record_result(&mut self, result: ActionResult) {
        debug_assert!(
            self.outstanding_action().map(|a| a.id.as_str()) == Some(result.action_id.as_str()),
            "result does not answer the outstanding action"
        );
        self.entries.push(ScratchpadEntry::Result(result));
    }

    /// The current ordered sequence, for building the next decision context.
    pub fn snapshot(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    /// Clear at a turn boundary.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn action_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ScratchpadEntry::Action(_)))
            .count()
    }

    pub fn result_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ScratchpadEntry::Result(_)))
            .count()
    }

    /// The action still awaiting its result, if any.
    pub fn outstanding_action(&self) -> Option<&Action> {
        match self.entries.last() {
            Some(ScratchpadEntry::Action(a)) => Some(a),
            _ => None,
        }
    }
}

/// One complete input-to-final-output interaction.
///
/// Created at turn start with an empty scratchpad; summarized into a history
/// record at turn end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// The user input that started this turn.
    pub input: String,

    /// The turn's dispatch log.
    pub scratchpad: Scratchpad,

    /// The committed final output, set only on `Done`.
    pub final_output: Option<serde_json::Value>,

    /// When the turn started.
    pub started_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            scratchpad: Scratchpad::new(),
            final_output: None,
            started_at: Utc::now(),
        }
    }
}
