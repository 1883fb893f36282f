//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod schema_runtime;

pub use schema_runtime::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Per-agent settings keyed by agent ID.
    #[serde(default)]
    pub agents: HashMap<String, AgentEntryConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Agents without an entry are enabled.
    pub fn agent_enabled(&self, agent_id: &str) -> bool {
        self.agents.get(agent_id).is_none_or(|entry| entry.enabled)
    }

    /// Settings map handed to the agent's `initialize`.
    pub fn agent_settings(&self, agent_id: &str) -> HashMap<String, serde_json::Value> {
        self.agents
            .get(agent_id)
            .map(|entry| entry.settings.clone())
            .unwrap_or_default()
    }
}

/// Per-agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEntryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Free-form keys (model, temperature, max_tokens, system_prompt, ...).
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl Default for AgentEntryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            settings: HashMap::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for the rolling log file. Falls back to the user data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Log file name prefix.
    #[serde(default = "default_log_file")]
    pub file: String,

    /// Emit JSON lines to the log file.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
            file: default_log_file(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "storyloom.log".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
