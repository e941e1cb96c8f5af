//! The terminal capability definition.
//!
//! `final_answer` exists so the decision source can see it alongside the
//! other capability definitions and propose it like any other action. The
//! loop short-circuits on its name before dispatch, so the handler is never
//! executed in normal operation.

use async_trait::async_trait;
use ratchet_core::capability::{Capability, ParamKind, ParamSpec, TERMINAL_CAPABILITY};
use ratchet_core::error::CapabilityError;

/// Definition-only capability carrying the terminal schema.
pub struct FinalAnswer;

#[async_trait]
impl Capability for FinalAnswer {
    fn name(&self) -> &str {
        TERMINAL_CAPABILITY
    }

    fn description(&self) -> &str {
        "Provide the final answer to the user in natural language. \
         tools_used must list the capability names used within the scratchpad."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("answer", ParamKind::String),
            ParamSpec::optional("tools_used", ParamKind::Array),
        ]
    }

    async fn call(
        &self,
        _args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, CapabilityError> {
        // The loop intercepts this name before dispatch. Reaching here means
        // a caller bypassed the loop.
        Err(CapabilityError::ExecutionFailed {
            name: TERMINAL_CAPABILITY.into(),
            reason: "the terminal capability is never executed".into(),
        })
    }
}
