//! Configuration loading and validation for the Ratchet loop.
//!
//! Loads a `LoopConfig` from a TOML file with environment variable
//! overrides (`RATCHET_*`). Validates all settings before the loop starts.

use ratchet_core::stream::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration surface consumed by the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Maximum non-terminal dispatch cycles per turn.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// How many completed turns the history view carries. Passed opaquely
    /// to the history backend.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Name of the reserved terminal capability.
    #[serde(default = "default_terminal_capability")]
    pub terminal_capability: String,

    /// Streaming channel settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_history_window() -> usize {
    8
}
fn default_terminal_capability() -> String {
    ratchet_core::TERMINAL_CAPABILITY.into()
}

/// Streaming channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Channel capacity in events.
    #[serde(default = "default_stream_capacity")]
    pub capacity: usize,

    /// What the producer does when the channel is full.
    #[serde(default = "default_overflow")]
    pub overflow: OverflowPolicy,
}

fn default_stream_capacity() -> usize {
    64
}
fn default_overflow() -> OverflowPolicy {
    OverflowPolicy::DropOldest
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: default_stream_capacity(),
            overflow: default_overflow(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_window: default_history_window(),
            terminal_capability: default_terminal_capability(),
            stream: StreamConfig::default(),
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl LoopConfig {
    /// Load from a TOML file, apply env overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded loop config");
        Ok(config)
    }

    /// Parse from a TOML string without env overrides. Mostly for tests.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RATCHET_*` environment variable overrides. Every setting in
    /// the config surface has one; unparsable values are ignored with a
    /// warning.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("RATCHET_MAX_ITERATIONS") {
            if let Ok(n) = v.parse() {
                self.max_iterations = n;
            } else {
                tracing::warn!(value = %v, "Ignoring unparsable RATCHET_MAX_ITERATIONS");
            }
        }
        if let Some(v) = get("RATCHET_HISTORY_WINDOW") {
            if let Ok(n) = v.parse() {
                self.history_window = n;
            } else {
                tracing::warn!(value = %v, "Ignoring unparsable RATCHET_HISTORY_WINDOW");
            }
        }
        if let Some(v) = get("RATCHET_TERMINAL_CAPABILITY") {
            self.terminal_capability = v;
        }
        if let Some(v) = get("RATCHET_STREAM_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.stream.capacity = n;
            } else {
                tracing::warn!(value = %v, "Ignoring unparsable RATCHET_STREAM_CAPACITY");
            }
        }
        if let Some(v) = get("RATCHET_STREAM_OVERFLOW") {
            match v.as_str() {
                "drop_oldest" => self.stream.overflow = OverflowPolicy::DropOldest,
                "abort" => self.stream.overflow = OverflowPolicy::Abort,
                _ => tracing::warn!(value = %v, "Ignoring unparsable RATCHET_STREAM_OVERFLOW"),
            }
        }
    }

    /// Validate all settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.stream.capacity == 0 {
            return Err(ConfigError::Invalid(
                "stream.capacity must be at least 1".into(),
            ));
        }
        if self.terminal_capability.is_empty() {
            return Err(ConfigError::Invalid(
                "terminal_capability must not be empty".into(),
            ));
        }
        Ok(())
    }
}
