use crate::core::errors::{BarrierError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the pending counter reacts to misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterMode {
    /// Unguarded counter: over-invocation drives it negative and later
    /// zero-crossings fire the completion again.
    #[default]
    Faithful,
    /// Single-use guards and a terminal state after the first completion.
    Hardened,
}

/// Barrier session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierConfig {
    /// Session name used in logs and events
    pub label: String,
    /// Counter semantics
    pub mode: CounterMode,
    /// Maximum number of guards outstanding at once
    pub max_outstanding: Option<usize>,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            label: format!("barrier_{}", Uuid::new_v4()),
            mode: CounterMode::Faithful,
            max_outstanding: None,
        }
    }
}

impl BarrierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(BarrierError::configuration_field(
                "label must not be empty",
                "label",
            ));
        }
        if self.max_outstanding == Some(0) {
            return Err(BarrierError::configuration_field(
                "max_outstanding must be greater than 0",
                "max_outstanding",
            ));
        }
        Ok(())
    }

    /// Unguarded counter, no limits
    pub fn faithful() -> Self {
        Self::default()
    }

    /// Single-use guards, sealed after completion
    pub fn hardened() -> Self {
        Self {
            mode: CounterMode::Hardened,
            ..Self::default()
        }
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_max_outstanding(mut self, max_outstanding: usize) -> Self {
        self.max_outstanding = Some(max_outstanding);
        self
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_hardened(&self) -> bool {
        self.mode == CounterMode::Hardened
    }
}
