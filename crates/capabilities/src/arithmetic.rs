//! Arithmetic capabilities — the canonical built-in set.
//!
//! Five binary operations over `x` and `y`. `divide` fails on a zero
//! divisor; the registry contains that failure into an error result so the
//! decision source can route around it.

use async_trait::async_trait;
use ratchet_core::capability::{Capability, ParamKind, ParamSpec};
use ratchet_core::error::CapabilityError;

fn number_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::required("x", ParamKind::Number),
        ParamSpec::required("y", ParamKind::Number),
    ]
}

fn read_operands(
    name: &str,
    args: &serde_json::Map<String, serde_json::Value>,
) -> Result<(f64, f64), CapabilityError> {
    let get = |key: &str| {
        args.get(key).and_then(|v| v.as_f64()).ok_or_else(|| {
            CapabilityError::ExecutionFailed {
                name: name.into(),
                reason: format!("'{key}' is not a number"),
            }
        })
    };
    Ok((get("x")?, get("y")?))
}

fn number_value(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Add two numbers.
pub struct Add;

#[async_trait]
impl Capability for Add {
    fn name(&self) -> &str {
        "add"
    }
    fn description(&self) -> &str {
        "Add x and y and return the result."
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        number_params()
    }
    async fn call(
        &self,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, CapabilityError> {
        let (x, y) = read_operands(self.name(), args)?;
        Ok(number_value(x + y))
    }
}

/// Subtract y from x.
pub struct Subtract;

#[async_trait]
impl Capability for Subtract {
    fn name(&self) -> &str {
        "subtract"
    }
    fn description(&self) -> &str {
        "Subtract y from x and return the result."
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        number_params()
    }
    async fn call(
        &self,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, CapabilityError> {
        let (x, y) = read_operands(self.name(), args)?;
        Ok(number_value(x - y))
    }
}

/// Multiply two numbers.
pub struct Multiply;

#[async_trait]
impl Capability for Multiply {
    fn name(&self) -> &str {
        "multiply"
    }
    fn description(&self) -> &str {
        "Multiply x and y and return the result."
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        number_params()
    }
    async fn call(
        &self,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, CapabilityError> {
        let (x, y) = read_operands(self.name(), args)?;
        Ok(number_value(x * y))
    }
}

/// Divide x by y. Fails on a zero divisor.
pub struct Divide;

#[async_trait]
impl Capability for Divide {
    fn name(&self) -> &str {
        "divide"
    }
    fn description(&self) -> &str {
        "Divide x by y and return the result. Fails if y is 0."
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        number_params()
    }
    async fn call(
        &self,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, CapabilityError> {
        let (x, y) = read_operands(self.name(), args)?;
        if y == 0.0 {
            return Err(CapabilityError::ExecutionFailed {
                name: self.name().into(),
                reason: "Division by zero is not allowed".into(),
            });
        }
        Ok(number_value(x / y))
    }
}

/// Raise x to the power of y.
pub struct Exponentiate;

#[async_trait]
impl Capability for Exponentiate {
    fn name(&self) -> &str {
        "exponentiate"
    }
    fn description(&self) -> &str {
        "Raise x to the power of y and return the result."
    }
    fn parameters(&self) -> Vec<ParamSpec> {
        number_params()
    }
    async fn call(
        &self,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, CapabilityError> {
        let (x, y) = read_operands(self.name(), args)?;
        Ok(number_value(x.powf(y)))
    }
}
