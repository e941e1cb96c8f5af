//! The agent loop state machine.
//!
//! `Init → Deciding → Dispatching → Deciding | Done | Exhausted`
//!
//! Each iteration asks the decision source "what should happen next?",
//! dispatches the first proposed action through the capability registry,
//! records the (action, result) pair in the scratchpad, and loops — until a
//! plain text decision or the reserved terminal action ends the turn, or the
//! iteration budget forces `Exhausted`. The optional streaming drive pushes
//! partial decision tokens, a `StepEnd` sentinel after each non-terminal
//! iteration, and `Done` exactly once after the terminal decision.

use crate::session::Session;
use ratchet_config::LoopConfig;
use ratchet_core::capability::{CapabilityRegistry, TERMINAL_CAPABILITY};
use ratchet_core::decision::{ActionResult, Decision, DecisionContext, DecisionSource};
use ratchet_core::error::{DecisionError, Error};
use ratchet_core::history::TurnRecord;
use ratchet_core::scratchpad::Turn;
use ratchet_core::stream::StreamProducer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a turn ended.
///
/// `Done` is the only outcome that commits to history. Exhaustion is
/// surfaced as its own variant, never as a silent best-guess answer.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The terminal decision was seen; `output` is committed.
    Done {
        output: serde_json::Value,
        iterations: u32,
    },

    /// The iteration budget ran out before a terminal decision.
    Exhausted { iterations: u32 },

    /// The consumer or caller cancelled mid-turn.
    Cancelled { iterations: u32 },
}

impl TurnOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// The committed output, if the turn completed.
    pub fn output(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Done { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Non-terminal dispatch cycles performed.
    pub fn iterations(&self) -> u32 {
        match self {
            Self::Done { iterations, .. }
            | Self::Exhausted { iterations }
            | Self::Cancelled { iterations } => *iterations,
        }
    }
}

/// The core loop that drives decision, dispatch, and recording.
///
/// One instance may serve many turns and sessions concurrently: it holds
/// only shared read-only state (source, registry, limits). Each `run` call
/// owns its `Turn` exclusively.
pub struct AgentLoop {
    /// The decision source to consult
    source: Arc<dyn DecisionSource>,

    /// Read-only capability table
    registry: Arc<CapabilityRegistry>,

    /// Maximum non-terminal dispatch cycles per turn
    max_iterations: u32,

    /// History window passed to the session's backend
    history_window: usize,

    /// Reserved terminal capability name
    terminal: String,
}

impl AgentLoop {
    /// Create a loop with default limits.
    pub fn new(source: Arc<dyn DecisionSource>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            source,
            registry,
            max_iterations: 10,
            history_window: 8,
            terminal: TERMINAL_CAPABILITY.into(),
        }
    }

    /// Create a loop from a validated config.
    pub fn from_config(
        source: Arc<dyn DecisionSource>,
        registry: Arc<CapabilityRegistry>,
        config: &LoopConfig,
    ) -> Self {
        Self::new(source, registry)
            .with_max_iterations(config.max_iterations)
            .with_history_window(config.history_window)
            .with_terminal_capability(config.terminal_capability.clone())
    }

    /// Set the maximum number of non-terminal dispatch cycles.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set the history window.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Override the reserved terminal capability name.
    pub fn with_terminal_capability(mut self, name: impl Into<String>) -> Self {
        self.terminal = name.into();
        self
    }

    /// Run one turn to completion without streaming.
    ///
    /// Dropping the returned future at its suspension point (the decision
    /// source call) abandons the turn without touching history.
    pub async fn run(&self, session: &Session, input: &str) -> Result<TurnOutcome, Error> {
        self.drive(session, input, None).await
    }

    /// Run one turn, streaming partial decision tokens into `out`.
    ///
    /// Closing (or dropping) the consumer end cancels the turn: dispatch
    /// stops, the channel closes, history is untouched.
    pub async fn run_streaming(
        &self,
        session: &Session,
        input: &str,
        out: StreamProducer,
    ) -> Result<TurnOutcome, Error> {
        self.drive(session, input, Some(&out)).await
    }

    async fn drive(
        &self,
        session: &Session,
        input: &str,
        sink: Option<&StreamProducer>,
    ) -> Result<TurnOutcome, Error> {
        // Init: fresh turn, empty scratchpad, counter at zero.
        let mut turn = Turn::new(input);
        let definitions = self.registry.definitions();
        let mut iterations: u32 = 0;

        info!(
            session_id = %session.id(),
            source = self.source.name(),
            "Turn started"
        );

        loop {
            // Deciding
            if self.cancelled(sink) {
                return Ok(TurnOutcome::Cancelled { iterations });
            }

            let ctx = DecisionContext {
                input: turn.input.clone(),
                history: session.history().context_for(self.history_window).await?,
                scratchpad: turn.scratchpad.snapshot().to_vec(),
                capabilities: definitions.clone(),
            };

            let decision = match sink {
                Some(out) => self.source.decide_streaming(&ctx, out).await?,
                None => self.source.decide(&ctx).await?,
            };

            // Cancellation between decision and dispatch must stop dispatch.
            if self.cancelled(sink) {
                return Ok(TurnOutcome::Cancelled { iterations });
            }

            let action = match decision {
                Decision::Text { content } => {
                    let output = serde_json::Value::String(content);
                    return self.finish(session, &mut turn, output, iterations, sink).await;
                }
                Decision::Actions { actions } => {
                    let mut proposed = actions.into_iter();
                    let Some(first) = proposed.next() else {
                        return Err(DecisionError::Malformed(
                            "decision proposed an empty action list".into(),
                        )
                        .into());
                    };
                    let dropped = proposed.len();
                    if dropped > 0 {
                        warn!(
                            dropped,
                            "Decision proposed multiple actions; dispatching the first only"
                        );
                    }
                    first
                }
            };

            // Terminal short-circuit: the arguments are the output, the
            // handler is never called.
            if action.name == self.terminal {
                let output = serde_json::Value::Object(action.args);
                return self.finish(session, &mut turn, output, iterations, sink).await;
            }

            // Dispatching
            debug!(
                iteration = iterations,
                capability = %action.name,
                action_id = %action.id,
                "Dispatching action"
            );

            let action_id = action.id.clone();
            turn.scratchpad.record_action(action.clone());

            // Lookup and validation failures become error results, exactly
            // like a failed handler: feedback, not a fault.
            let result = match self.registry.invoke(&action).await {
                Ok(result) => result,
                Err(e) => {
                    debug!(capability = %action.name, error = %e, "Dispatch rejected");
                    ActionResult::error(&action_id, e.to_string())
                }
            };
            turn.scratchpad.record_result(result);
            iterations += 1;

            if let Some(out) = sink {
                if out.step_end().is_err() {
                    return Ok(TurnOutcome::Cancelled { iterations });
                }
            }

            // Budget guard
            if iterations >= self.max_iterations {
                warn!(
                    session_id = %session.id(),
                    iterations,
                    "Iteration budget exhausted before a terminal decision"
                );
                if let Some(out) = sink {
                    out.close();
                }
                return Ok(TurnOutcome::Exhausted { iterations });
            }
        }
    }

    fn cancelled(&self, sink: Option<&StreamProducer>) -> bool {
        sink.is_some_and(|out| out.is_closed())
    }

    /// Commit a completed turn: emit `Done`, append to history.
    async fn finish(
        &self,
        session: &Session,
        turn: &mut Turn,
        output: serde_json::Value,
        iterations: u32,
        sink: Option<&StreamProducer>,
    ) -> Result<TurnOutcome, Error> {
        if let Some(out) = sink {
            if out.done().is_err() {
                // The consumer went away before the terminal decision could
                // be delivered — do not commit.
                return Ok(TurnOutcome::Cancelled { iterations });
            }
        }

        turn.final_output = Some(output.clone());
        session
            .history()
            .append(TurnRecord::new(&turn.input, output.clone()))
            .await?;

        info!(session_id = %session.id(), iterations, "Turn done");
        Ok(TurnOutcome::Done { output, iterations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_core::decision::Action;

    #[test]
    fn outcome_accessors() {
        let done = TurnOutcome::Done {
            output: serde_json::json!("5"),
            iterations: 1,
        };
        assert!(done.is_done());
        assert_eq!(done.output(), Some(&serde_json::json!("5")));
        assert_eq!(done.iterations(), 1);

        let exhausted = TurnOutcome::Exhausted { iterations: 3 };
        assert!(!exhausted.is_done());
        assert!(exhausted.output().is_none());
    }

    #[test]
    fn builder_floors_max_iterations() {
        struct Null;

        #[async_trait::async_trait]
        impl DecisionSource for Null {
            fn name(&self) -> &str {
                "null"
            }
            async fn decide(
                &self,
                _ctx: &DecisionContext,
            ) -> Result<Decision, DecisionError> {
                Ok(Decision::action(Action::new("noop", serde_json::Map::new())))
            }
        }

        let agent = AgentLoop::new(Arc::new(Null), Arc::new(CapabilityRegistry::new()))
            .with_max_iterations(0);
        assert_eq!(agent.max_iterations, 1);
    }
}
