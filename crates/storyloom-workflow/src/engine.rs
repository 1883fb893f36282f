//! Workflow engine.
//!
//! The engine turns templates into workflows, submits their tasks to the
//! queue and folds task updates into the workflow roll-up until every task
//! is terminal. Task state is written by the queue, except for workflows
//! cancelled before they run: those never reach the queue.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::select_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

use storyloom_core::{AgentRegistry, EventBus, RegistryError};
use storyloom_protocols::agent::{Agent, AgentStatusInfo, Capability};
use storyloom_protocols::event::OrchestrationEvent;
use storyloom_protocols::task::TaskStatus;
use storyloom_protocols::types::Parameters;
use storyloom_protocols::workflow::{WorkflowDefinition, WorkflowResult, WorkflowStatus};
use storyloom_queue::{TaskQueue, TaskQueueStatus};

use crate::error::WorkflowError;
use crate::templates::{self, WorkflowTemplate};

/// Listing entry for a registered agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub status: AgentStatusInfo,
    pub description: String,
    pub version: String,
    pub capabilities: Vec<Capability>,
}

/// Workflow engine.
pub struct WorkflowEngine {
    registry: Arc<AgentRegistry>,
    events: EventBus,
    queue: TaskQueue,
    templates: Vec<WorkflowTemplate>,
    /// Every workflow created by this engine, in creation order.
    history: RwLock<Vec<WorkflowDefinition>>,
    cancel_requests: Mutex<HashSet<String>>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkflowEngine {
    /// Create an engine over an existing registry, bus and queue.
    pub fn new(registry: Arc<AgentRegistry>, events: EventBus, queue: TaskQueue) -> Self {
        Self {
            registry,
            events,
            queue,
            templates: templates::builtin(),
            history: RwLock::new(Vec::new()),
            cancel_requests: Mutex::new(HashSet::new()),
            forwarders: Mutex::new(Vec::new()),
        }
    }

    /// Add an agent and relay its events onto the bus.
    pub async fn register_agent(&self, agent: Arc<dyn Agent>) -> Result<(), WorkflowError> {
        self.registry
            .register(agent.clone())
            .map_err(|RegistryError::AlreadyRegistered(id)| WorkflowError::DuplicateAgent(id))?;
        info!("Registered agent {} ({})", agent.id(), agent.name());
        let forwarder = self.events.forward_agent_events(agent);
        self.forwarders.lock().push(forwarder);
        Ok(())
    }

    /// Build a workflow from a builtin template.
    ///
    /// The template name is checked first, then the parameters, then that
    /// every agent of the chain is registered.
    pub fn create_predefined_workflow(
        &self,
        template_name: &str,
        parameters: Parameters,
    ) -> Result<WorkflowDefinition, WorkflowError> {
        let template = self
            .templates
            .iter()
            .find(|t| t.name == template_name)
            .ok_or_else(|| WorkflowError::UnknownTemplate(template_name.to_string()))?;

        template.validate(&parameters)?;

        if let Some(missing) = template
            .required_agents()
            .into_iter()
            .find(|id| !self.registry.contains(id))
        {
            return Err(WorkflowError::AgentNotRegistered(missing.to_string()));
        }

        let workflow = template.instantiate(&parameters);
        info!(
            "Created workflow {} ({}) with {} tasks",
            workflow.id,
            template_name,
            workflow.tasks.len()
        );
        self.history.write().push(workflow.clone());
        Ok(workflow)
    }

    /// Run a workflow to completion.
    ///
    /// Returns once every task is terminal. Task failures are reported in
    /// the result, not as an error.
    pub async fn execute_workflow(
        &self,
        workflow: &mut WorkflowDefinition,
    ) -> Result<WorkflowResult, WorkflowError> {
        if workflow.status != WorkflowStatus::Created {
            return Err(WorkflowError::AlreadyExecuted(workflow.id.clone()));
        }

        let started = Instant::now();
        info!("Starting workflow {} ({})", workflow.id, workflow.name);
        workflow.mark_started();
        self.publish(workflow);

        let cancelled_early = self.cancel_requests.lock().contains(&workflow.id);
        if cancelled_early {
            self.settle_cancelled(workflow);
        } else {
            self.drive(workflow).await?;
        }

        // The last update may have settled the tasks without a roll-up change.
        if workflow.refresh() {
            self.publish(workflow);
        }
        self.cancel_requests.lock().remove(&workflow.id);

        let result = WorkflowResult::from_workflow(workflow, started.elapsed().as_millis() as u64);
        match result.status {
            WorkflowStatus::Completed => info!(
                "Workflow {} completed in {}ms",
                workflow.id, result.duration_ms
            ),
            status => warn!(
                "Workflow {} ended {}: {} failed, {} cancelled",
                workflow.id,
                status,
                result.failed_task_ids.len(),
                result.cancelled_task_ids.len()
            ),
        }
        Ok(result)
    }

    /// Cancel every non-terminal task of a workflow.
    ///
    /// A workflow that has not started yet is cancelled as soon as it is
    /// executed.
    pub async fn cancel_workflow(&self, workflow_id: &str) -> Result<usize, WorkflowError> {
        let status = self
            .history
            .read()
            .iter()
            .find(|w| w.id == workflow_id)
            .map(|w| w.status)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(workflow_id.to_string()))?;
        if status.is_terminal() {
            return Ok(0);
        }
        info!("Cancelling workflow {}", workflow_id);
        self.cancel_requests.lock().insert(workflow_id.to_string());
        Ok(self.queue.cancel_workflow(workflow_id).await?)
    }

    /// Cancel a single task.
    pub async fn cancel_task(&self, task_id: &str) -> Result<(), WorkflowError> {
        Ok(self.queue.cancel_task(task_id).await?)
    }

    /// Cancel running tasks and empty the queue.
    pub async fn clear_queue(&self) -> Result<usize, WorkflowError> {
        Ok(self.queue.clear().await?)
    }

    /// Force an agent back to Idle.
    pub async fn reset_agent(&self, agent_id: &str) -> Result<(), WorkflowError> {
        let agent = self
            .registry
            .get(agent_id)
            .ok_or_else(|| WorkflowError::AgentNotRegistered(agent_id.to_string()))?;
        agent.reset().await?;
        debug!("Reset agent {}", agent_id);
        Ok(())
    }

    /// The template catalogue.
    pub fn templates(&self) -> &[WorkflowTemplate] {
        &self.templates
    }

    /// Registered agents in registration order.
    pub async fn agents(&self) -> Vec<AgentSummary> {
        let mut out = Vec::with_capacity(self.registry.len());
        for agent in self.registry.list() {
            out.push(AgentSummary {
                status: agent.status().await,
                description: agent.description().to_string(),
                version: agent.version().to_string(),
                capabilities: agent.capabilities().await,
            });
        }
        out
    }

    /// Latest known state of a workflow.
    pub fn workflow(&self, workflow_id: &str) -> Option<WorkflowDefinition> {
        self.history
            .read()
            .iter()
            .find(|w| w.id == workflow_id)
            .cloned()
    }

    /// Every workflow created by this engine, in creation order.
    pub fn workflows(&self) -> Vec<WorkflowDefinition> {
        self.history.read().clone()
    }

    pub fn queue_status(&self) -> TaskQueueStatus {
        self.queue.status()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Submit every task and fold queue updates into the workflow until
    /// all of them are terminal.
    async fn drive(&self, workflow: &mut WorkflowDefinition) -> Result<(), WorkflowError> {
        let mut handles = Vec::with_capacity(workflow.tasks.len());
        for task in &workflow.tasks {
            match self.queue.enqueue(task.clone()).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!("Failed to submit workflow {}: {}", workflow.id, e);
                    let _ = self.queue.cancel_workflow(&workflow.id).await;
                    return Err(e.into());
                }
            }
        }
        self.apply_cancel_request(workflow).await?;

        let mut updates = select_all(
            handles
                .into_iter()
                .map(|h| WatchStream::new(h.into_receiver())),
        );

        while !workflow.all_tasks_terminal() {
            let Some(task) = updates.next().await else {
                warn!("Queue closed while workflow {} was running", workflow.id);
                return Err(storyloom_queue::QueueError::Closed.into());
            };
            self.apply_cancel_request(workflow).await?;
            // The update that settles the last task is always announced, even
            // when a Failed roll-up leaves nothing else to report.
            if workflow.apply_task_update(&task) || workflow.all_tasks_terminal() {
                self.publish(workflow);
            }
        }

        Ok(())
    }

    /// Cancel a workflow whose cancel request arrived before it ran. No
    /// task is submitted, so no agent ever sees one.
    fn settle_cancelled(&self, workflow: &mut WorkflowDefinition) {
        info!("Workflow {} was cancelled before it started", workflow.id);
        workflow.cancel_requested = true;
        for task in &mut workflow.tasks {
            task.error = Some("cancelled".to_string());
            task.transition(TaskStatus::Cancelled);
            self.events
                .publish(OrchestrationEvent::TaskStatusChanged(task.clone()));
        }
    }

    /// Fold a pending cancel request into the workflow and make sure every
    /// submitted task sees it.
    async fn apply_cancel_request(
        &self,
        workflow: &mut WorkflowDefinition,
    ) -> Result<(), WorkflowError> {
        if workflow.cancel_requested {
            return Ok(());
        }
        let requested = self.cancel_requests.lock().contains(&workflow.id);
        if !requested {
            return Ok(());
        }
        workflow.cancel_requested = true;
        self.queue.cancel_workflow(&workflow.id).await?;
        Ok(())
    }

    fn publish(&self, workflow: &WorkflowDefinition) {
        debug!(
            "Workflow {} is {} ({:.0}%)",
            workflow.id, workflow.status, workflow.progress
        );
        if let Some(slot) = self
            .history
            .write()
            .iter_mut()
            .find(|w| w.id == workflow.id)
        {
            *slot = workflow.clone();
        }
        self.events
            .publish(OrchestrationEvent::WorkflowStatusChanged(Box::new(
                workflow.clone(),
            )));
    }
}

impl Drop for WorkflowEngine {
    fn drop(&mut self) {
        for forwarder in self.forwarders.lock().drain(..) {
            forwarder.abort();
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
