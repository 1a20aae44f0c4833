//! Engine configuration
//!
//! ```toml
//! enable_state_history = true
//!
//! [guard]
//! max_expression_len = 1024
//! max_depth = 32
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use workflow_guard::GuardConfig;

/// Environment variable overriding [`EngineConfig::enable_state_history`]
pub const ENV_ENABLE_STATE_HISTORY: &str = "WORKFLOWS_ENABLE_STATE_HISTORY";

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

/// Runtime configuration of a [`WorkflowEngine`](crate::WorkflowEngine)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Append a history entry on every state change
    pub enable_state_history: bool,

    /// Limits for guard conditions
    pub guard: GuardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_state_history: true,
            guard: GuardConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// No path, or a path that does not exist, yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)?;
                Self::from_toml_str(&contents)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `WORKFLOWS_ENABLE_STATE_HISTORY` if it is set
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_ENABLE_STATE_HISTORY) {
            self.enable_state_history = parse_flag(&raw).ok_or(ConfigError::InvalidEnv {
                name: ENV_ENABLE_STATE_HISTORY,
                value: raw,
            })?;
        }
        Ok(self)
    }

    pub fn with_state_history(mut self, enabled: bool) -> Self {
        self.enable_state_history = enabled;
        self
    }

    pub fn with_guard(mut self, guard: GuardConfig) -> Self {
        self.guard = guard;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
