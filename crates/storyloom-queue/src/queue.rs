//! Public handle of the task queue actor.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use storyloom_config::QueueConfig;
use storyloom_core::{AgentRegistry, EventBus};
use storyloom_protocols::task::WorkflowTask;

use crate::actor::{Command, QueueActor};
use crate::error::QueueError;
use crate::handle::TaskHandle;
use crate::status::TaskQueueStatus;

/// Task queue.
///
/// Cheap to clone; every clone talks to the same actor, which stops once the
/// last clone is dropped. Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct TaskQueue {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<TaskQueueStatus>,
}

impl TaskQueue {
    /// Create a queue dispatching to agents of `registry` and publishing on `events`.
    pub fn new(registry: Arc<AgentRegistry>, events: EventBus, config: QueueConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(TaskQueueStatus::default());
        let actor = QueueActor::new(registry, events, config, rx, status_tx);
        tokio::spawn(actor.run());
        Self { commands, status }
    }

    /// Append a task as Pending.
    pub async fn enqueue(&self, task: WorkflowTask) -> Result<TaskHandle, QueueError> {
        self.request(|reply| Command::Enqueue { task, reply }).await?
    }

    /// Cancel one task.
    ///
    /// Pending and Paused tasks are cancelled immediately. Running tasks are
    /// signalled and become Cancelled once the agent yields. Terminal tasks
    /// are left untouched.
    pub async fn cancel_task(&self, task_id: &str) -> Result<(), QueueError> {
        let task_id = task_id.to_string();
        self.request(|reply| Command::Cancel { task_id, reply }).await?
    }

    /// Cancel every non-terminal task of a workflow. Returns how many were hit.
    pub async fn cancel_workflow(&self, workflow_id: &str) -> Result<usize, QueueError> {
        let workflow_id = workflow_id.to_string();
        self.request(|reply| Command::CancelWorkflow { workflow_id, reply })
            .await
    }

    /// Hold a Pending task back from dispatch.
    pub async fn pause_task(&self, task_id: &str) -> Result<(), QueueError> {
        let task_id = task_id.to_string();
        self.request(|reply| Command::Pause { task_id, reply }).await?
    }

    /// Return a Paused task to Pending.
    pub async fn resume_task(&self, task_id: &str) -> Result<(), QueueError> {
        let task_id = task_id.to_string();
        self.request(|reply| Command::Resume { task_id, reply }).await?
    }

    /// Cancel Running tasks, then drop every task and reset the counts.
    /// Returns the number of tasks removed.
    pub async fn clear(&self) -> Result<usize, QueueError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// Latest snapshot of a task.
    pub async fn task(&self, task_id: &str) -> Result<WorkflowTask, QueueError> {
        let id = task_id.to_string();
        self.request(|reply| Command::Get { task_id: id, reply })
            .await?
            .ok_or_else(|| QueueError::TaskNotFound(task_id.to_string()))
    }

    /// All tasks of a workflow in enqueue order.
    pub async fn workflow_tasks(&self, workflow_id: &str) -> Result<Vec<WorkflowTask>, QueueError> {
        let workflow_id = workflow_id.to_string();
        self.request(|reply| Command::List { workflow_id, reply })
            .await
    }

    /// Aggregate counts as of the last transition.
    pub fn status(&self) -> TaskQueueStatus {
        *self.status.borrow()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| QueueError::Closed)?;
        rx.await.map_err(|_| QueueError::Closed)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
