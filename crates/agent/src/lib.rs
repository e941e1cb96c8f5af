//! The Ratchet agent loop — iterative, bounded, streamable tool dispatch.
//!
//! The loop follows a **Decide → Dispatch → Record** cycle:
//!
//! 1. **Assemble context** (history view + input + scratchpad snapshot)
//! 2. **Ask the decision source** what should happen next
//! 3. **If plain text or the terminal action**: commit the output and stop
//! 4. **Otherwise**: dispatch the first proposed action through the
//!    capability registry, record the (action, result) pair, loop back
//!
//! The cycle continues until a terminal decision or the iteration budget
//! runs out. A consumer can watch the decision stream token-by-token through
//! the bounded channel in `ratchet_core::stream`, and cancel the turn by
//! closing it.

pub mod loop_runner;
pub mod session;

pub use loop_runner::{AgentLoop, TurnOutcome};
pub use session::{Session, SessionId, SessionStore};
