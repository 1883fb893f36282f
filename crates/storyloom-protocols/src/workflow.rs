//! Workflow definitions and roll-up rules.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{TaskStatus, WorkflowTask};
use crate::types::Parameters;

/// Workflow lifecycle state.
///
/// Created -> Running -> {Completed | Failed | Cancelled}; terminal states
/// are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowStatus::Created => "created",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// An instantiated, parameterised task graph built from a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Template the workflow was built from.
    pub template_name: String,
    /// Tasks in insertion order, which is also the fallback topological order.
    pub tasks: Vec<WorkflowTask>,
    /// Parameters the workflow was instantiated with.
    #[serde(default)]
    pub parameters: Parameters,
    /// Roll-up status.
    pub status: WorkflowStatus,
    /// Weighted mean of task progress, 0-100.
    pub progress: f32,
    /// Set when the whole workflow was cancelled by a caller.
    #[serde(default)]
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowDefinition {
    /// Create an empty workflow in the Created state.
    pub fn new(
        name: impl Into<String>,
        template_name: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            template_name: template_name.into(),
            tasks: Vec::new(),
            parameters,
            status: WorkflowStatus::Created,
            progress: 0.0,
            cancel_requested: false,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Append a task.
    pub fn push_task(&mut self, task: WorkflowTask) {
        self.tasks.push(task);
    }

    /// Get a task by ID.
    pub fn task(&self, task_id: &str) -> Option<&WorkflowTask> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Whether every task has reached a final status.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.iter().all(WorkflowTask::is_terminal)
    }

    /// Status derived from the task statuses.
    pub fn rolled_up_status(&self) -> WorkflowStatus {
        if self.cancel_requested {
            return WorkflowStatus::Cancelled;
        }
        if self.tasks.iter().any(|t| t.status == TaskStatus::Failed) {
            return WorkflowStatus::Failed;
        }
        if self.tasks.iter().all(|t| t.status == TaskStatus::Completed) {
            return WorkflowStatus::Completed;
        }
        if self.all_tasks_terminal() {
            return WorkflowStatus::Cancelled;
        }
        WorkflowStatus::Running
    }

    /// Weighted mean of task progress.
    pub fn rolled_up_progress(&self) -> f32 {
        let total_weight: f32 = self.tasks.iter().map(|t| t.weight.max(0.0)).sum();
        if total_weight <= f32::EPSILON {
            return 0.0;
        }
        let weighted: f32 = self
            .tasks
            .iter()
            .map(|t| t.weight.max(0.0) * f32::from(t.progress))
            .sum();
        weighted / total_weight
    }

    /// Replace a task with its latest snapshot and recompute the roll-up.
    ///
    /// Returns `true` if the workflow status or progress changed. A workflow
    /// that already reached a terminal status keeps it.
    pub fn apply_task_update(&mut self, update: &WorkflowTask) -> bool {
        let Some(slot) = self.tasks.iter_mut().find(|t| t.id == update.id) else {
            return false;
        };
        *slot = update.clone();
        self.refresh()
    }

    /// Recompute status and progress; returns `true` if either changed.
    pub fn refresh(&mut self) -> bool {
        let before = (self.status, self.progress);
        self.progress = self.rolled_up_progress();
        if !self.status.is_terminal() && self.status != WorkflowStatus::Created {
            let next = self.rolled_up_status();
            if next.is_terminal() && !self.all_tasks_terminal() && next != WorkflowStatus::Failed {
                // Cancellation only settles once every task has yielded.
                self.status = WorkflowStatus::Running;
            } else {
                self.status = next;
            }
            if self.status.is_terminal() {
                self.finished_at = Some(Utc::now());
            }
        }
        (self.status, self.progress) != before
    }

    /// Move Created -> Running.
    pub fn mark_started(&mut self) {
        self.status = WorkflowStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// IDs of tasks that ended in the given status.
    pub fn task_ids_with_status(&self, status: TaskStatus) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.id.clone())
            .collect()
    }
}

/// Terminal outcome of one workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    /// True iff zero tasks ended Failed.
    pub is_success: bool,
    pub failed_task_ids: Vec<String>,
    pub cancelled_task_ids: Vec<String>,
    /// Payloads of completed tasks by task ID.
    #[serde(default)]
    pub outputs: HashMap<String, serde_json::Value>,
    pub duration_ms: u64,
}

impl WorkflowResult {
    /// Build the result from a workflow whose tasks are all terminal.
    pub fn from_workflow(workflow: &WorkflowDefinition, duration_ms: u64) -> Self {
        let failed_task_ids = workflow.task_ids_with_status(TaskStatus::Failed);
        let outputs = workflow
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .filter_map(|t| t.output.clone().map(|o| (t.id.clone(), o)))
            .collect();
        Self {
            workflow_id: workflow.id.clone(),
            status: workflow.status,
            is_success: failed_task_ids.is_empty(),
            failed_task_ids,
            cancelled_task_ids: workflow.task_ids_with_status(TaskStatus::Cancelled),
            outputs,
            duration_ms,
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
