//! Event bus for orchestration notifications.
//!
//! Delivery is best-effort: publishing never blocks, and a subscriber that
//! falls behind loses the oldest events rather than stalling the engine.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use storyloom_protocols::agent::Agent;
use storyloom_protocols::event::OrchestrationEvent;

/// Default number of buffered events per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Broadcast channel of [`OrchestrationEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrchestrationEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers that received it.
    pub fn publish(&self, event: OrchestrationEvent) -> usize {
        trace!("Publishing event: {}", event.kind());
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.sender.subscribe()
    }

    /// Relay an agent's own events onto the bus until the agent's channel
    /// closes.
    pub fn forward_agent_events(&self, agent: Arc<dyn Agent>) -> JoinHandle<()> {
        let mut rx = agent.subscribe();
        let agent_id = agent.id().to_string();
        let bus = self.clone();
        drop(agent);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        bus.publish(event.into());
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event forwarder for agent {} lagged, dropped {} events", agent_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Agent {} event channel closed", agent_id);
                        break;
                    }
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use storyloom_protocols::agent::AgentStatus;
    use storyloom_protocols::task::WorkflowTask;

    use crate::registry::test_agent::StaticAgent;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let task = WorkflowTask::new("wf", "Draft", "draft", "writer");
        assert_eq!(bus.publish(OrchestrationEvent::TaskStatusChanged(task)), 0);
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let task = WorkflowTask::new("wf-1", "Draft", "draft", "writer");
        assert_eq!(bus.publish(OrchestrationEvent::TaskStatusChanged(task)), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.workflow_id(), Some("wf-1"));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            let task = WorkflowTask::new(format!("wf-{i}"), "Draft", "draft", "writer");
            bus.publish(OrchestrationEvent::TaskStatusChanged(task));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }

    #[tokio::test]
    async fn test_forward_agent_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let agent = Arc::new(StaticAgent::new("critic"));

        let handle = bus.forward_agent_events(agent.clone());
        agent.emit(AgentStatus::Working);

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            OrchestrationEvent::AgentStatusChanged(info) => {
                assert_eq!(info.agent_id, "critic");
                assert_eq!(info.status, AgentStatus::Working);
            }
            other => panic!("unexpected event: {}", other.kind()),
        }

        drop(agent);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
