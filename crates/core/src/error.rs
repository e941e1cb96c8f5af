//! Error types for the Ratchet domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! The taxonomy separates errors the loop recovers from locally
//! (capability lookup, argument validation, handler failure — these become
//! error results in the scratchpad) from errors that end the turn
//! (decision source failures, stream cancellation).

use thiserror::Error;

/// The top-level error type for all Ratchet operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Capability errors ---
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Decision source errors ---
    #[error("Decision source error: {0}")]
    Decision(#[from] DecisionError),

    // --- History errors ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Streaming errors ---
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by the capability registry.
///
/// `Unknown` and `InvalidArguments` surface *before* a handler runs and are
/// fed back to the decision source as error results. `ExecutionFailed` never
/// escapes `CapabilityRegistry::invoke` — it is contained into an
/// `ActionResult` with `is_error = true`.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("Capability already registered: {0}")]
    Duplicate(String),

    #[error("Unknown capability: {0}")]
    Unknown(String),

    #[error("Invalid arguments for {name}: {}", fields.join(", "))]
    InvalidArguments { name: String, fields: Vec<String> },

    #[error("Capability execution failed: {name} — {reason}")]
    ExecutionFailed { name: String, reason: String },
}

/// Errors from the decision source adapter.
///
/// These are fatal to the turn: the loop does not retry them (retry policy
/// belongs to the adapter or its caller).
#[derive(Debug, Clone, Error)]
pub enum DecisionError {
    #[error("Decision source unavailable: {0}")]
    Unavailable(String),

    #[error("Decision source timed out: {0}")]
    Timeout(String),

    #[error("Malformed decision: {0}")]
    Malformed(String),
}

/// Errors from a history store backend.
#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Errors from the streaming channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The consumer closed the channel (or was dropped). Production must
    /// stop; the turn is reported as cancelled.
    #[error("Stream closed by consumer")]
    Closed,

    /// The channel was full and the overflow policy is `Abort`.
    #[error("Stream capacity exceeded")]
    Overflow,
}
