//! Orchestration events published to observers.

use crate::agent::{AgentEvent, AgentStatusInfo, AgentTaskResult};
use crate::task::WorkflowTask;
use crate::workflow::WorkflowDefinition;

/// Typed status-change notifications consumed outside the core.
#[derive(Debug, Clone)]
pub enum OrchestrationEvent {
    /// A task changed status or progress.
    TaskStatusChanged(WorkflowTask),
    /// A workflow's roll-up status or progress changed.
    WorkflowStatusChanged(Box<WorkflowDefinition>),
    /// Forwarded from an agent.
    AgentStatusChanged(AgentStatusInfo),
    /// Forwarded from an agent.
    AgentTaskCompleted(AgentTaskResult),
}

impl OrchestrationEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestrationEvent::TaskStatusChanged(_) => "task_status_changed",
            OrchestrationEvent::WorkflowStatusChanged(_) => "workflow_status_changed",
            OrchestrationEvent::AgentStatusChanged(_) => "agent_status_changed",
            OrchestrationEvent::AgentTaskCompleted(_) => "agent_task_completed",
        }
    }

    /// Workflow the event belongs to, if any.
    pub fn workflow_id(&self) -> Option<&str> {
        match self {
            OrchestrationEvent::TaskStatusChanged(task) => Some(&task.workflow_id),
            OrchestrationEvent::WorkflowStatusChanged(wf) => Some(&wf.id),
            _ => None,
        }
    }
}

impl From<AgentEvent> for OrchestrationEvent {
    fn from(event: AgentEvent) -> Self {
        match event {
            AgentEvent::StatusChanged(info) => OrchestrationEvent::AgentStatusChanged(info),
            AgentEvent::TaskCompleted(result) => OrchestrationEvent::AgentTaskCompleted(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStatus;
    use crate::types::Parameters;

    #[test]
    fn test_event_kind_and_workflow_id() {
        let task = WorkflowTask::new("wf-9", "Review", "review", "critic");
        let event = OrchestrationEvent::TaskStatusChanged(task);
        assert_eq!(event.kind(), "task_status_changed");
        assert_eq!(event.workflow_id(), Some("wf-9"));

        let wf = WorkflowDefinition::new("Check", "ConsistencyCheck", Parameters::new());
        let id = wf.id.clone();
        let event = OrchestrationEvent::WorkflowStatusChanged(Box::new(wf));
        assert_eq!(event.workflow_id(), Some(id.as_str()));
    }

    #[test]
    fn test_from_agent_event() {
        let info = AgentStatusInfo {
            agent_id: "critic".to_string(),
            name: "Critic".to_string(),
            status: AgentStatus::Working,
            current_task: Some("t-1".to_string()),
            progress: 10,
        };
        let event: OrchestrationEvent = AgentEvent::StatusChanged(info).into();
        assert_eq!(event.kind(), "agent_status_changed");
        assert!(event.workflow_id().is_none());
    }
}
