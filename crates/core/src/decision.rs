//! Decision domain types and the decision source adapter trait.
//!
//! A `Decision` is the decision source's answer to "what should happen
//! next?" for one loop iteration. It is a closed tagged union resolved once
//! at the loop boundary: either plain text (no action requested) or a
//! non-empty ordered sequence of proposed actions.

use crate::capability::CapabilityDefinition;
use crate::error::DecisionError;
use crate::history::TurnRecord;
use crate::scratchpad::ScratchpadEntry;
use crate::stream::StreamProducer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single proposed capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Opaque call ID, unique within a single decision.
    pub id: String,

    /// Name of the capability to invoke.
    pub name: String,

    /// Arguments as a JSON object.
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl Action {
    /// Create an action with a fresh ID.
    pub fn new(
        name: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            args,
        }
    }
}

/// The outcome of dispatching one action.
///
/// Always paired with exactly one prior `Action`. A failed handler becomes a
/// result with `is_error = true` — feedback the decision source can react
/// to, never a process-ending fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// The action this result answers.
    pub action_id: String,

    /// Output value, or a human-readable error message when `is_error`.
    pub content: serde_json::Value,

    /// Whether the dispatch failed.
    #[serde(default)]
    pub is_error: bool,
}

impl ActionResult {
    /// A successful result.
    pub fn ok(action_id: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            action_id: action_id.into(),
            content,
            is_error: false,
        }
    }

    /// An error result with a human-readable message.
    pub fn error(action_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            content: serde_json::Value::String(message.into()),
            is_error: true,
        }
    }
}

/// One decision from the decision source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    /// A plain text response — the turn ends with this text as output.
    Text { content: String },

    /// One or more proposed actions, in preference order.
    ///
    /// The loop dispatches only the first; an empty sequence is malformed.
    Actions { actions: Vec<Action> },
}

impl Decision {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn actions(actions: Vec<Action>) -> Self {
        Self::Actions { actions }
    }

    /// A decision proposing a single action.
    pub fn action(action: Action) -> Self {
        Self::Actions {
            actions: vec![action],
        }
    }
}

/// Everything the decision source sees when asked for the next step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionContext {
    /// The user input for this turn.
    pub input: String,

    /// Bounded view of completed turns, oldest first.
    pub history: Vec<TurnRecord>,

    /// The current turn's scratchpad snapshot, in causal order.
    pub scratchpad: Vec<ScratchpadEntry>,

    /// Definitions of the capabilities the source may propose.
    pub capabilities: Vec<CapabilityDefinition>,
}

/// Narrow interface to the external model.
///
/// The adapter's own reasoning is out of scope — the loop consumes it only
/// through this request/response contract. Adapter failures are fatal to the
/// turn and are not retried by the loop.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// A human-readable name for this source (e.g. "ollama", "scripted").
    fn name(&self) -> &str;

    /// Produce the next decision for the given context.
    ///
    /// This is the loop's sole suspension point inside `Deciding`.
    async fn decide(&self, ctx: &DecisionContext) -> std::result::Result<Decision, DecisionError>;

    /// Streaming variant: emit partial tokens into `tokens` while the
    /// decision is produced, then return the same final `Decision`.
    ///
    /// Default implementation calls `decide()` and emits a text decision's
    /// content as a single token. A send failure means the consumer went
    /// away; the decision is still returned and the loop handles the
    /// cancellation.
    async fn decide_streaming(
        &self,
        ctx: &DecisionContext,
        tokens: &StreamProducer,
    ) -> std::result::Result<Decision, DecisionError> {
        let decision = self.decide(ctx).await?;
        if let Decision::Text { content } = &decision {
            let _ = tokens.token(content.clone());
        }
        Ok(decision)
    }
}
