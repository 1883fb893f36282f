//! Orchestrator facade.
//!
//! Builds the registry, event bus, queue and engine once from
//! configuration. Everything the orchestrator uses is handed to it; nothing
//! is looked up globally.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use storyloom_config::Config;
use storyloom_core::{AgentRegistry, EventBus};
use storyloom_protocols::agent::Agent;
use storyloom_protocols::event::OrchestrationEvent;
use storyloom_protocols::types::Parameters;
use storyloom_protocols::workflow::{WorkflowDefinition, WorkflowResult};
use storyloom_queue::TaskQueue;

use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;

/// Fully wired orchestration core.
pub struct Orchestrator {
    config: Config,
    engine: Arc<WorkflowEngine>,
}

impl Orchestrator {
    /// Wire the core and register `agents`.
    ///
    /// Agents disabled in `[agents.<id>]` are skipped. An agent that fails
    /// to initialize is still registered; it stays Offline and its tasks
    /// fail fast.
    pub async fn new(config: Config, agents: Vec<Arc<dyn Agent>>) -> Result<Self, WorkflowError> {
        let events = EventBus::new(config.engine.event_capacity);
        let registry = Arc::new(AgentRegistry::new());
        let queue = TaskQueue::new(registry.clone(), events.clone(), config.queue.clone());
        let engine = Arc::new(WorkflowEngine::new(registry, events, queue));

        for agent in agents {
            let id = agent.id().to_string();
            if !config.agent_enabled(&id) {
                info!("Agent {} disabled by configuration", id);
                continue;
            }
            match agent.initialize(&config.agent_settings(&id)).await {
                Ok(()) => debug!("Initialized agent {}", id),
                Err(e) => warn!("Agent {} failed to initialize: {}", id, e),
            }
            engine.register_agent(agent).await?;
        }

        info!(
            "Orchestrator ready with {} agents",
            engine.registry().len()
        );
        Ok(Self { config, engine })
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.engine.subscribe()
    }

    /// Create a workflow from a template and run it to completion.
    pub async fn run_template(
        &self,
        template_name: &str,
        parameters: Parameters,
    ) -> Result<(WorkflowDefinition, WorkflowResult), WorkflowError> {
        let mut workflow = self
            .engine
            .create_predefined_workflow(template_name, parameters)?;
        let result = self.engine.execute_workflow(&mut workflow).await?;
        Ok((workflow, result))
    }
}
