//! Conversation history backends for Ratchet.
//!
//! The core defines the `HistoryStore` trait; this crate provides the
//! built-in implementations. Relational and vector-backed stores are
//! external collaborators and plug in through the same trait.

mod in_memory;
mod noop;

pub use in_memory::InMemoryHistory;
pub use noop::NoopHistory;
