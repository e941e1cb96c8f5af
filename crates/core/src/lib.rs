//! # Ratchet Core
//!
//! Domain types, traits, and error definitions for the Ratchet tool-dispatch
//! loop. This crate defines the domain model that all other crates implement
//! against; the only runtime machinery it carries is the streaming channel.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the decision
//! source, capabilities, and history backends. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod capability;
pub mod decision;
pub mod error;
pub mod history;
pub mod scratchpad;
pub mod stream;

// Re-export key types at crate root for ergonomics
pub use capability::{
    Capability, CapabilityDefinition, CapabilityRegistry, ParamKind, ParamSpec,
    TERMINAL_CAPABILITY,
};
pub use decision::{Action, ActionResult, Decision, DecisionContext, DecisionSource};
pub use error::{CapabilityError, DecisionError, Error, HistoryError, Result, StreamError};
pub use history::{HistoryStore, TurnRecord};
pub use scratchpad::{Scratchpad, ScratchpadEntry, Turn};
pub use stream::{channel, OverflowPolicy, StreamConsumer, StreamProducer, TokenEvent};
