// Optimizer Configuration
//
// Tunables shared by every planner built from one optimizer context. Loaded once at
// startup (or on reload) and immutable afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown rule: {0}")]
    UnknownRule(String),
}

/// Optimizer tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Cap on rule firings in the rewrite phase of one statement
    pub max_rule_applications: usize,
    /// Cap on alternatives costed by the cost-based phase of one statement
    pub max_search_steps: Option<usize>,
    /// Wall-clock budget of the cost-based phase, in milliseconds
    pub search_timeout_ms: Option<u64>,
    /// Weight of I/O relative to CPU when comparing costs
    pub io_cost_weight: f64,
    /// Row estimate for tables without statistics
    pub default_table_rows: u64,
    /// Rewrite rules to run, by name; all rules when absent
    pub enabled_rules: Option<Vec<String>>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_rule_applications: 1000,
            max_search_steps: None,
            search_timeout_ms: None,
            io_cost_weight: 4.0,
            default_table_rows: 1000,
            enabled_rules: None,
        }
    }
}

impl OptimizerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: OptimizerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rule_applications == 0 {
            return Err(ConfigError::Invalid("max_rule_applications must be positive".to_string()));
        }
        if !self.io_cost_weight.is_finite() || self.io_cost_weight < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "io_cost_weight must be a non-negative number, got {}", self.io_cost_weight
            )));
        }
        if self.default_table_rows == 0 {
            return Err(ConfigError::Invalid("default_table_rows must be positive".to_string()));
        }
        if self.max_search_steps == Some(0) {
            return Err(ConfigError::Invalid("max_search_steps must be positive".to_string()));
        }
        Ok(())
    }
}
