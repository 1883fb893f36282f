//! Aggregate queue counts.

use serde::{Deserialize, Serialize};

use storyloom_protocols::task::{TaskStatus, WorkflowTask};

/// Read-only snapshot of the queue's status buckets.
///
/// The buckets always sum to the number of tasks enqueued since the last
/// clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQueueStatus {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub paused: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl TaskQueueStatus {
    /// Count tasks by status.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a WorkflowTask>) -> Self {
        let mut status = Self::default();
        for task in tasks {
            status.record(task.status);
        }
        status
    }

    fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Running => self.running += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Paused => self.paused += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }

    /// Sum of all buckets.
    pub fn total(&self) -> usize {
        self.pending + self.running + self.completed + self.paused + self.failed + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tasks() {
        let mut tasks = Vec::new();
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            let mut task = WorkflowTask::new("wf", "t", "draft", "writer");
            task.transition(status);
            tasks.push(task);
        }

        let status = TaskQueueStatus::from_tasks(&tasks);
        assert_eq!(status.pending, 1);
        assert_eq!(status.running, 1);
        assert_eq!(status.completed, 2);
        assert_eq!(status.cancelled, 1);
        assert_eq!(status.total(), 5);
    }

    #[test]
    fn test_default_is_zero() {
        let status = TaskQueueStatus::default();
        assert_eq!(status.total(), 0);
    }
}
