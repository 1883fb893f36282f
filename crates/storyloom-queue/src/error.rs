//! Queue errors.

use storyloom_protocols::task::TaskStatus;
use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Task not found.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A task with the same ID is already queued.
    #[error("Task already enqueued: {0}")]
    DuplicateTask(String),

    /// The requested transition is not allowed from the task's status.
    #[error("Task {task_id} is {status}, expected {expected}")]
    InvalidState {
        task_id: String,
        status: TaskStatus,
        expected: TaskStatus,
    },

    /// The queue actor has stopped.
    #[error("Task queue is closed")]
    Closed,
}
