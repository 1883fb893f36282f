//! Agent protocol definitions.
//!
//! Agents are the execution units of a workflow: each one owns a role
//! (director, writer, editor, ...) and runs at most one task at a time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::task::WorkflowTask;
use crate::types::AgentSettings;

/// Core trait for agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the stable agent ID.
    fn id(&self) -> &str;

    /// Returns the human-readable name.
    fn name(&self) -> &str;

    /// Returns a short description of the agent's role.
    fn description(&self) -> &str;

    /// Returns the agent implementation version.
    fn version(&self) -> &str;

    /// One-time setup from a configuration map. Safe to retry.
    async fn initialize(&self, settings: &AgentSettings) -> Result<(), AgentError>;

    /// Non-blocking snapshot of the agent's state.
    async fn status(&self) -> AgentStatusInfo;

    /// Ordered capability list. Side-effect free.
    async fn capabilities(&self) -> Vec<Capability>;

    /// Execute one task.
    ///
    /// Moves the agent Idle -> Working -> Idle (or Error on failure). Fails
    /// with [`AgentError::Busy`] if the agent is already working.
    async fn execute(
        &self,
        task: &WorkflowTask,
        ctx: TaskContext,
    ) -> Result<AgentTaskResult, AgentError>;

    /// Force the agent back to Idle, discarding in-flight bookkeeping.
    async fn reset(&self) -> Result<(), AgentError>;

    /// Subscribe to the agent's own status and completion events.
    fn subscribe(&self) -> broadcast::Receiver<AgentEvent>;
}

/// Agent lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    Idle,
    Working,
    Waiting,
    Error,
    Offline,
}

impl AgentStatus {
    /// Error and Offline agents cannot accept work until reset or re-initialized.
    pub fn is_available(self) -> bool {
        !matches!(self, AgentStatus::Error | AgentStatus::Offline)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Working => "working",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Error => "error",
            AgentStatus::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Snapshot of an agent's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusInfo {
    pub agent_id: String,
    pub name: String,
    pub status: AgentStatus,
    /// Task being worked on; `None` when Idle or Offline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    /// Progress of the current task, 0-100.
    pub progress: u8,
}

/// A named capability advertised by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Outcome of one `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTaskResult {
    pub task_id: String,
    pub agent_id: String,
    pub is_success: bool,
    pub execution_time: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentTaskResult {
    /// Create a successful result.
    pub fn success(
        task_id: impl Into<String>,
        agent_id: impl Into<String>,
        payload: serde_json::Value,
        execution_time: Duration,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            is_success: true,
            execution_time,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failure(
        task_id: impl Into<String>,
        agent_id: impl Into<String>,
        error: impl Into<String>,
        execution_time: Duration,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            is_success: false,
            execution_time,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Events raised by an agent.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Raised on every status transition.
    StatusChanged(AgentStatusInfo),
    /// Raised once per finished task, success or failure.
    TaskCompleted(AgentTaskResult),
}

/// Output of a completed predecessor, handed to dependents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamOutput {
    pub task_id: String,
    pub task_type: String,
    pub agent_id: String,
    pub payload: serde_json::Value,
}

/// Progress callback into the dispatcher that owns the task.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<Arc<dyn Fn(u8) + Send + Sync>>,
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// A reporter that drops every update.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Report progress; values above 100 are clamped.
    pub fn report(&self, progress: u8) {
        if let Some(sink) = &self.sink {
            sink(progress.min(100));
        }
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

/// Context for a single task execution.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Cooperative cancellation; agents check it at their checkpoints.
    pub cancellation: CancellationToken,

    /// Progress sink.
    pub progress: ProgressReporter,

    /// Outputs of completed predecessors, in dependency order.
    pub upstream: Vec<UpstreamOutput>,
}

impl TaskContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            progress: ProgressReporter::noop(),
            upstream: Vec::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_upstream(mut self, upstream: Vec<UpstreamOutput>) -> Self {
        self.upstream = upstream;
        self
    }

    /// Check if the task should stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Find the output of the nearest predecessor of the given task type.
    pub fn upstream_of_type(&self, task_type: &str) -> Option<&UpstreamOutput> {
        self.upstream.iter().rev().find(|u| u.task_type == task_type)
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
