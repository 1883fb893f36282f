//! Workflow task definition and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Parameters;

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting in the queue.
    Pending,
    /// Currently being executed by its target agent.
    Running,
    /// Completed successfully.
    Completed,
    /// Held back from dispatch until resumed.
    Paused,
    /// Cancelled by a caller or by an upstream failure.
    Cancelled,
    /// The agent reported a failure.
    Failed,
}

impl TaskStatus {
    /// Completed, Cancelled and Failed are final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Failed
        )
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Paused => "paused",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A task bound to exactly one target agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTask {
    /// Unique task ID.
    pub id: String,
    /// Owning workflow.
    pub workflow_id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form classification agents use to select behaviour.
    pub task_type: String,
    /// Agent that executes this task.
    pub target_agent_id: String,
    /// Current status.
    pub status: TaskStatus,
    /// Progress, 0-100.
    pub progress: u8,
    /// Predecessor task IDs; all must be Completed before this task runs.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Inputs rendered from the workflow parameters.
    #[serde(default)]
    pub inputs: Parameters,
    /// Weight of this task in the workflow progress roll-up.
    pub weight: f32,
    /// Payload produced by the agent on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Failure or cancellation reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowTask {
    /// Create a new pending task.
    pub fn new(
        workflow_id: impl Into<String>,
        name: impl Into<String>,
        task_type: impl Into<String>,
        target_agent_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            name: name.into(),
            task_type: task_type.into(),
            target_agent_id: target_agent_id.into(),
            status: TaskStatus::Pending,
            progress: 0,
            depends_on: Vec::new(),
            inputs: Parameters::new(),
            weight: 1.0,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a predecessor.
    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.depends_on.push(task_id.into());
        self
    }

    /// Set the inputs.
    pub fn with_inputs(mut self, inputs: Parameters) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the progress weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Look up a string input.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(|v| v.as_str())
    }

    /// Move to a new status, stamping `updated_at`.
    pub fn transition(&mut self, status: TaskStatus) {
        self.status = status;
        if status == TaskStatus::Completed {
            self.progress = 100;
        }
        self.updated_at = Utc::now();
    }

    /// Whether the task has reached a final status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
