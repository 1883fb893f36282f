//! Minimal agent used by the core tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use storyloom_protocols::agent::{
    Agent, AgentEvent, AgentStatus, AgentStatusInfo, AgentTaskResult, Capability, TaskContext,
};
use storyloom_protocols::error::AgentError;
use storyloom_protocols::task::WorkflowTask;
use storyloom_protocols::types::AgentSettings;

pub(crate) struct StaticAgent {
    id: String,
    events: broadcast::Sender<AgentEvent>,
}

impl StaticAgent {
    pub(crate) fn new(id: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            id: id.to_string(),
            events,
        }
    }

    pub(crate) fn emit(&self, status: AgentStatus) {
        let _ = self.events.send(AgentEvent::StatusChanged(self.info(status)));
    }

    fn info(&self, status: AgentStatus) -> AgentStatusInfo {
        AgentStatusInfo {
            agent_id: self.id.clone(),
            name: self.id.clone(),
            status,
            current_task: None,
            progress: 0,
        }
    }
}

#[async_trait]
impl Agent for StaticAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "static test agent"
    }

    fn version(&self) -> &str {
        "0.0.0"
    }

    async fn initialize(&self, _settings: &AgentSettings) -> Result<(), AgentError> {
        Ok(())
    }

    async fn status(&self) -> AgentStatusInfo {
        self.info(AgentStatus::Idle)
    }

    async fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("noop", "Does nothing")]
    }

    async fn execute(
        &self,
        task: &WorkflowTask,
        _ctx: TaskContext,
    ) -> Result<AgentTaskResult, AgentError> {
        Ok(AgentTaskResult::success(
            &task.id,
            &self.id,
            serde_json::Value::Null,
            Duration::ZERO,
        ))
    }

    async fn reset(&self) -> Result<(), AgentError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }
}
