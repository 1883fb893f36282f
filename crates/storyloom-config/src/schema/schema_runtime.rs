//! Runtime configuration types (engine, queue, generator).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Workflow engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Events buffered per subscriber before the slowest one starts lagging.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

/// Task queue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Interval of the periodic dispatch pass.
    #[serde(default = "default_dispatch_interval")]
    pub dispatch_interval_ms: u64,

    /// Upper bound on Running tasks across all agents. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_tasks: Option<usize>,

    /// Running tasks exceeding this are cancelled and failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_timeout_secs: Option<u64>,
}

fn default_dispatch_interval() -> u64 {
    50
}

impl QueueConfig {
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms.max(1))
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dispatch_interval_ms: default_dispatch_interval(),
            max_concurrent_tasks: None,
            task_timeout_secs: None,
        }
    }
}

/// Configuration of the built-in simulated text generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Artificial latency per generation call.
    #[serde(default = "default_latency")]
    pub latency_ms: u64,

    /// Model name reported when an agent does not set one.
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_latency() -> u64 {
    25
}

fn default_model() -> String {
    "simulated".to_string()
}

impl GeneratorConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency(),
            default_model: default_model(),
        }
    }
}
