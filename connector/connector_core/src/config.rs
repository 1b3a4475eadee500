//! Configuration for the policy engine.
//!
//! Handles loading, validating and merging engine configuration. Every field
//! has a default, so an empty or absent file yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ConfigError, Result};
use crate::logging::LoggingConfig;

/// How unsatisfied duties affect the outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DutyEnforcement {
    /// The action is granted and unsatisfied duties are reported as
    /// outstanding obligations for the caller to track.
    #[default]
    Advisory,

    /// Any unsatisfied duty denies the action.
    Blocking,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Treatment of unsatisfied duties
    #[serde(default)]
    pub duty_enforcement: DutyEnforcement,

    /// Separator between the segments of a hierarchical scope
    #[serde(default = "default_scope_delimiter")]
    pub scope_delimiter: String,

    /// Evaluations kept per policy by the audit trail (0 disables auditing)
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,

    /// Policies tracked by the audit trail; the least recently evaluated is
    /// evicted beyond this (0 disables auditing)
    #[serde(default = "default_audit_max_policies")]
    pub audit_max_policies: usize,

    /// Left operands compared directly against request facts
    #[serde(default)]
    pub fact_operands: Vec<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_scope_delimiter() -> String {
    ".".to_string()
}

fn default_audit_capacity() -> usize {
    1000
}

fn default_audit_max_policies() -> usize {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duty_enforcement: DutyEnforcement::default(),
            scope_delimiter: default_scope_delimiter(),
            audit_capacity: default_audit_capacity(),
            audit_max_policies: default_audit_max_policies(),
            fact_operands: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// Falls back to defaults when no path is given or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(path).map_err(|e| {
                    ConfigError::LoadFailed(format!("{}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)?
            }
            Some(path) => {
                warn!("Configuration file not found: {}", path.display());
                Self::default()
            }
            None => {
                info!("No configuration file specified, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.scope_delimiter.is_empty() {
            return Err(ConfigError::Invalid("Scope delimiter cannot be empty".to_string()).into());
        }

        if self.fact_operands.iter().any(|operand| operand.trim().is_empty()) {
            return Err(ConfigError::Invalid("Fact operands cannot be blank".to_string()).into());
        }

        if self.audit_capacity == 0 || self.audit_max_policies == 0 {
            warn!("Audit capacity is zero, evaluations will not be audited");
        }

        Ok(())
    }

    /// Merge with another configuration, letting `other` win where it differs
    /// from the defaults.
    pub fn merge(&mut self, other: EngineConfig) {
        let defaults = EngineConfig::default();

        if other.duty_enforcement != defaults.duty_enforcement {
            self.duty_enforcement = other.duty_enforcement;
        }

        if other.scope_delimiter != defaults.scope_delimiter {
            self.scope_delimiter = other.scope_delimiter;
        }

        if other.audit_capacity != defaults.audit_capacity {
            self.audit_capacity = other.audit_capacity;
        }

        if other.audit_max_policies != defaults.audit_max_policies {
            self.audit_max_policies = other.audit_max_policies;
        }

        for operand in other.fact_operands {
            if !self.fact_operands.contains(&operand) {
                self.fact_operands.push(operand);
            }
        }

        if other.logging != defaults.logging {
            self.logging = other.logging;
        }
    }
}
