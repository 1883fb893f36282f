//! Scriptable agent for queue tests.
//!
//! Behaviour is selected by the task type:
//! - `hang`: waits until cancelled
//! - `fail`: returns an execution error
//! - `progress`: reports 50% then succeeds
//! - `slow`: succeeds after 20ms
//! - `stubborn`: ignores cancellation and succeeds after 100ms
//! - anything else: succeeds after 1ms

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use storyloom_protocols::agent::{
    Agent, AgentEvent, AgentStatus, AgentStatusInfo, AgentTaskResult, Capability, TaskContext,
};
use storyloom_protocols::error::AgentError;
use storyloom_protocols::task::WorkflowTask;
use storyloom_protocols::types::AgentSettings;

/// Tracks how many executions overlap.
#[derive(Default)]
pub(crate) struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockAgent {
    id: String,
    status: Mutex<AgentStatus>,
    executed: Mutex<Vec<String>>,
    journal: Mutex<Vec<String>>,
    resets: AtomicUsize,
    own: Gauge,
    shared: Option<Arc<Gauge>>,
    events: broadcast::Sender<AgentEvent>,
}

impl MockAgent {
    pub(crate) fn new(id: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            id: id.to_string(),
            status: Mutex::new(AgentStatus::Idle),
            executed: Mutex::new(Vec::new()),
            journal: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
            own: Gauge::default(),
            shared: None,
            events,
        }
    }

    pub(crate) fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.shared = Some(gauge);
        self
    }

    pub(crate) fn set_status(&self, status: AgentStatus) {
        *self.status.lock() = status;
    }

    /// Names of executed tasks, in start order.
    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Execution starts and resets, in the order they happened.
    pub(crate) fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.executed.lock().len()
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub(crate) fn max_concurrent(&self) -> usize {
        self.own.max()
    }

    async fn perform(
        &self,
        task: &WorkflowTask,
        ctx: &TaskContext,
    ) -> Result<AgentTaskResult, AgentError> {
        let delay = match task.task_type.as_str() {
            "hang" => {
                ctx.cancellation.cancelled().await;
                return Err(AgentError::Cancelled(task.id.clone()));
            }
            "fail" => {
                return Err(AgentError::ExecutionFailed(format!("{} refused", self.id)));
            }
            "progress" => {
                ctx.progress.report(50);
                Duration::from_millis(1)
            }
            "slow" => Duration::from_millis(20),
            "stubborn" => {
                let delay = Duration::from_millis(100);
                tokio::time::sleep(delay).await;
                return Ok(AgentTaskResult::success(
                    &task.id,
                    &self.id,
                    serde_json::json!({ "agent": self.id, "task": task.name }),
                    delay,
                ));
            }
            _ => Duration::from_millis(1),
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = ctx.cancellation.cancelled() => {
                return Err(AgentError::Cancelled(task.id.clone()));
            }
        }

        Ok(AgentTaskResult::success(
            &task.id,
            &self.id,
            serde_json::json!({
                "agent": self.id,
                "task": task.name,
                "upstream": ctx.upstream.len(),
            }),
            delay,
        ))
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "scripted test agent"
    }

    fn version(&self) -> &str {
        "0.0.0"
    }

    async fn initialize(&self, _settings: &AgentSettings) -> Result<(), AgentError> {
        Ok(())
    }

    async fn status(&self) -> AgentStatusInfo {
        AgentStatusInfo {
            agent_id: self.id.clone(),
            name: self.id.clone(),
            status: *self.status.lock(),
            current_task: None,
            progress: 0,
        }
    }

    async fn capabilities(&self) -> Vec<Capability> {
        Vec::new()
    }

    async fn execute(
        &self,
        task: &WorkflowTask,
        ctx: TaskContext,
    ) -> Result<AgentTaskResult, AgentError> {
        self.executed.lock().push(task.name.clone());
        self.journal.lock().push(format!("run {}", task.name));
        self.own.enter();
        if let Some(gauge) = &self.shared {
            gauge.enter();
        }

        let result = self.perform(task, &ctx).await;

        if let Some(gauge) = &self.shared {
            gauge.leave();
        }
        self.own.leave();
        result
    }

    async fn reset(&self) -> Result<(), AgentError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push("reset".to_string());
        self.set_status(AgentStatus::Idle);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }
}
