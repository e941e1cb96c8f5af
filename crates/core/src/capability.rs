//! Capability trait and registry — the abstraction over what the loop can do.
//!
//! Capabilities are the operations the decision source may ask the loop to
//! perform: arithmetic, lookups, file access, whatever the embedding
//! application registers. Each one carries a typed parameter spec that is
//! validated *before* the handler runs, so argument-shape mistakes become
//! feedback rather than duck-typed call failures.

use crate::decision::{Action, ActionResult};
use crate::error::CapabilityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The reserved terminal capability name.
///
/// When a decision proposes an action with this name, the loop short-circuits
/// to `Done` and the action's arguments become the turn's final output. The
/// handler — if one is registered at all — is never executed.
pub const TERMINAL_CAPABILITY: &str = "final_answer";

/// The JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// The JSON Schema type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Does this JSON value satisfy the kind?
    fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One parameter in a capability's argument spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// A capability definition projected for the decision source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    pub name: String,
    pub description: String,

    /// JSON Schema describing the parameters.
    pub parameters: serde_json::Value,
}

/// Build a JSON Schema object from an ordered parameter spec.
fn schema_for(params: &[ParamSpec]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for p in params {
        properties.insert(
            p.name.clone(),
            serde_json::json!({ "type": p.kind.type_name() }),
        );
        if p.required {
            required.push(serde_json::Value::String(p.name.clone()));
        }
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The core Capability trait.
///
/// Handlers are assumed to complete within bounded time; a handler that can
/// block indefinitely must be wrapped with an external timeout before
/// registration.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The unique name of this capability (e.g. "add", "divide").
    fn name(&self) -> &str;

    /// A description of what this capability does (sent to the decision source).
    fn description(&self) -> &str;

    /// Ordered parameter spec, validated before every call.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Run the capability with already-validated arguments.
    async fn call(
        &self,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<serde_json::Value, CapabilityError>;

    /// Convert this capability into a definition for the decision source.
    fn to_definition(&self) -> CapabilityDefinition {
        CapabilityDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: schema_for(&self.parameters()),
        }
    }
}

/// A registry of available capabilities.
///
/// Populated once at startup, immutable thereafter, and safe to share across
/// simultaneous turns. Registration rejects duplicate names rather than
/// silently replacing — a duplicate is a wiring bug, not a runtime choice.
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Register a capability. Fails if the name is already taken.
    pub fn register(
        &mut self,
        capability: Box<dyn Capability>,
    ) -> std::result::Result<(), CapabilityError> {
        let name = capability.name().to_string();
        if self.capabilities.contains_key(&name) {
            return Err(CapabilityError::Duplicate(name));
        }
        self.capabilities.insert(name, capability);
        Ok(())
    }

    /// Look up a capability by name.
    pub fn resolve(&self, name: &str) -> std::result::Result<&dyn Capability, CapabilityError> {
        self.capabilities
            .get(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| CapabilityError::Unknown(name.to_string()))
    }

    /// All definitions, for handing to the decision source. Sorted by name
    /// so the decision context is reproducible across runs.
    pub fn definitions(&self) -> Vec<CapabilityDefinition> {
        let mut definitions: Vec<_> =
            self.capabilities.values().map(|c| c.to_definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.capabilities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Validate an action's arguments against its capability's spec.
    ///
    /// Returns the failing field names: missing required parameters and
    /// type mismatches. Unknown extra fields are ignored.
    fn validate(
        capability: &dyn Capability,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Vec<String> {
        let mut failing = Vec::new();
        for spec in capability.parameters() {
            match args.get(&spec.name) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        failing.push(spec.name);
                    }
                }
                None if spec.required => failing.push(spec.name),
                None => {}
            }
        }
        failing
    }

    /// Dispatch one action through its capability.
    ///
    /// Lookup and validation failures are returned as errors for the loop to
    /// record as error results. A handler failure never propagates out of
    /// here — it is contained into an `ActionResult` with `is_error = true`
    /// so the decision source can react to it.
    pub async fn invoke(
        &self,
        action: &Action,
    ) -> std::result::Result<ActionResult, CapabilityError> {
        let capability = self.resolve(&action.name)?;

        let failing = Self::validate(capability, &action.args);
        if !failing.is_empty() {
            return Err(CapabilityError::InvalidArguments {
                name: action.name.clone(),
                fields: failing,
            });
        }

        match capability.call(&action.args).await {
            Ok(value) => Ok(ActionResult::ok(&action.id, value)),
            Err(e) => {
                tracing::warn!(capability = %action.name, error = %e, "Capability failed");
                Ok(ActionResult::error(&action.id, e.to_string()))
            }
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
