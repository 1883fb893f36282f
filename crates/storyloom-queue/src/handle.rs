//! Per-task watch handle.

use tokio::sync::watch;

use storyloom_protocols::task::WorkflowTask;

/// Observes the latest state of one enqueued task.
///
/// The handle keeps the last value after the queue drops the task, so a task
/// removed by `clear` still reads as Cancelled.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    task_id: String,
    rx: watch::Receiver<WorkflowTask>,
}

impl TaskHandle {
    pub(crate) fn new(rx: watch::Receiver<WorkflowTask>) -> Self {
        let task_id = rx.borrow().id.clone();
        Self { task_id, rx }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Latest snapshot.
    pub fn current(&self) -> WorkflowTask {
        self.rx.borrow().clone()
    }

    /// Wait until the task reaches a terminal status or the queue drops it.
    pub async fn wait(&mut self) -> WorkflowTask {
        self.wait_until(WorkflowTask::is_terminal).await
    }

    /// Wait until `done` holds for the latest snapshot. Returns the last
    /// snapshot if the queue drops the task first.
    pub async fn wait_until(&mut self, done: impl Fn(&WorkflowTask) -> bool) -> WorkflowTask {
        loop {
            {
                let task = self.rx.borrow_and_update();
                if done(&*task) {
                    return task.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }

    /// The underlying receiver, for merging into streams.
    pub fn into_receiver(self) -> watch::Receiver<WorkflowTask> {
        self.rx
    }
}
