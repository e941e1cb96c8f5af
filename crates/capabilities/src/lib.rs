//! Built-in capability implementations for Ratchet.

mod arithmetic;
mod final_answer;

pub use arithmetic::{Add, Divide, Exponentiate, Multiply, Subtract};
pub use final_answer::FinalAnswer;

use ratchet_core::capability::CapabilityRegistry;
use ratchet_core::error::CapabilityError;

/// A registry preloaded with the arithmetic set and the terminal definition.
pub fn standard_registry() -> Result<CapabilityRegistry, CapabilityError> {
    let mut registry = CapabilityRegistry::new();
    registry.register(Box::new(Add))?;
    registry.register(Box::new(Subtract))?;
    registry.register(Box::new(Multiply))?;
    registry.register(Box::new(Divide))?;
    registry.register(Box::new(Exponentiate))?;
    registry.register(Box::new(FinalAnswer))?;
    Ok(registry)
}
