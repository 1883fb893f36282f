//! Story agent implementation.
//!
//! A `StoryAgent` runs one task at a time: it assembles a prompt from the
//! task inputs and upstream outputs, hands it to its generator and wraps
//! the text in an [`AgentTaskResult`]. Cancellation is observed before the
//! generator call, while it is in flight, and once more before the result
//! is published.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use storyloom_protocols::agent::{
    Agent, AgentEvent, AgentStatus, AgentStatusInfo, AgentTaskResult, Capability, TaskContext,
};
use storyloom_protocols::error::{AgentError, GenerationError};
use storyloom_protocols::generator::{GenerationRequest, TextGenerator};
use storyloom_protocols::task::WorkflowTask;
use storyloom_protocols::types::AgentSettings;

use crate::role::Role;

const EVENT_CAPACITY: usize = 64;

/// Generation parameters accepted by [`Agent::initialize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSettings {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

impl GenerationSettings {
    /// Parse a configuration map. Unknown keys are ignored.
    pub fn from_settings(settings: &AgentSettings) -> Result<Self, AgentError> {
        let mut parsed = Self::default();

        for key in ["model", "system_prompt"] {
            if let Some(value) = settings.get(key) {
                let text = value
                    .as_str()
                    .ok_or_else(|| AgentError::Initialization(format!("{} must be a string", key)))?;
                match key {
                    "model" => parsed.model = Some(text.to_string()),
                    _ => parsed.system_prompt = Some(text.to_string()),
                }
            }
        }

        if let Some(value) = settings.get("temperature") {
            let t = value
                .as_f64()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or_else(|| {
                    AgentError::Initialization(
                        "temperature must be a number between 0 and 2".to_string(),
                    )
                })?;
            parsed.temperature = Some(t as f32);
        }

        if let Some(value) = settings.get("max_tokens") {
            let n = value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    AgentError::Initialization("max_tokens must be a positive integer".to_string())
                })?;
            parsed.max_tokens = Some(n);
        }

        Ok(parsed)
    }
}

#[derive(Debug, Clone)]
struct AgentState {
    status: AgentStatus,
    current_task: Option<String>,
    progress: u8,
}

/// Agent playing one [`Role`].
pub struct StoryAgent {
    id: String,
    role: Role,
    generator: Arc<dyn TextGenerator>,
    settings: RwLock<GenerationSettings>,
    state: Mutex<AgentState>,
    events: broadcast::Sender<AgentEvent>,
}

impl StoryAgent {
    /// Create an Idle agent registered under the role's default ID.
    pub fn new(role: Role, generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_id(role.id(), role, generator)
    }

    /// Create an Idle agent with a custom ID.
    pub fn with_id(id: impl Into<String>, role: Role, generator: Arc<dyn TextGenerator>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id: id.into(),
            role,
            generator,
            settings: RwLock::new(GenerationSettings::default()),
            state: Mutex::new(AgentState {
                status: AgentStatus::Idle,
                current_task: None,
                progress: 0,
            }),
            events,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings.read().clone()
    }

    fn snapshot(&self, state: &AgentState) -> AgentStatusInfo {
        AgentStatusInfo {
            agent_id: self.id.clone(),
            name: self.role.display_name().to_string(),
            status: state.status,
            current_task: state.current_task.clone(),
            progress: state.progress,
        }
    }

    /// Apply a state change and raise `StatusChanged`.
    fn update(&self, apply: impl FnOnce(&mut AgentState)) {
        let info = {
            let mut state = self.state.lock();
            apply(&mut state);
            self.snapshot(&state)
        };
        debug!("Agent {} is {}", self.id, info.status);
        let _ = self.events.send(AgentEvent::StatusChanged(info));
    }

    /// Claim the agent for a task, or report why it cannot run one.
    fn begin(&self, task: &WorkflowTask) -> Result<(), AgentError> {
        let info = {
            let mut state = self.state.lock();
            match state.status {
                AgentStatus::Working | AgentStatus::Waiting => {
                    return Err(AgentError::Busy {
                        agent_id: self.id.clone(),
                        task_id: state.current_task.clone().unwrap_or_default(),
                    });
                }
                AgentStatus::Error | AgentStatus::Offline => {
                    return Err(AgentError::ExecutionFailed(format!(
                        "agent {} is {}",
                        self.id, state.status
                    )));
                }
                AgentStatus::Idle => {}
            }
            state.status = AgentStatus::Working;
            state.current_task = Some(task.id.clone());
            state.progress = 0;
            self.snapshot(&state)
        };
        let _ = self.events.send(AgentEvent::StatusChanged(info));
        Ok(())
    }

    fn report(&self, ctx: &TaskContext, progress: u8) {
        self.state.lock().progress = progress;
        ctx.progress.report(progress);
    }

    fn build_request(&self, task: &WorkflowTask, ctx: &TaskContext) -> GenerationRequest {
        let settings = self.settings.read().clone();
        let mut request = GenerationRequest::new(
            &self.id,
            &task.task_type,
            self.role.build_prompt(task, &ctx.upstream),
        );
        request.system_prompt = Some(
            settings
                .system_prompt
                .unwrap_or_else(|| self.role.system_prompt()),
        );
        request.model = settings.model;
        request.temperature = settings.temperature;
        request.max_tokens = settings.max_tokens;
        request
    }

    /// Back to Idle without raising `TaskCompleted`.
    fn abandon(&self, task: &WorkflowTask) -> AgentError {
        debug!("Agent {} abandoned task {}", self.id, task.id);
        self.update(|state| {
            state.status = AgentStatus::Idle;
            state.current_task = None;
            state.progress = 0;
        });
        AgentError::Cancelled(task.id.clone())
    }

    fn fail(&self, task: &WorkflowTask, started: Instant, err: AgentError) -> AgentError {
        warn!("Agent {} failed task {}: {}", self.id, task.id, err);
        self.update(|state| {
            state.status = AgentStatus::Error;
        });
        let result = AgentTaskResult::failure(&task.id, &self.id, err.to_string(), started.elapsed());
        let _ = self.events.send(AgentEvent::TaskCompleted(result));
        err
    }
}

#[async_trait]
impl Agent for StoryAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        self.role.display_name()
    }

    fn description(&self) -> &str {
        self.role.description()
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn initialize(&self, settings: &AgentSettings) -> Result<(), AgentError> {
        match GenerationSettings::from_settings(settings) {
            Ok(parsed) => {
                *self.settings.write() = parsed;
                let was_offline = self.state.lock().status == AgentStatus::Offline;
                if was_offline {
                    self.update(|state| state.status = AgentStatus::Idle);
                }
                debug!("Agent {} initialized", self.id);
                Ok(())
            }
            Err(err) => {
                warn!("Agent {} failed to initialize: {}", self.id, err);
                self.update(|state| {
                    state.status = AgentStatus::Offline;
                    state.current_task = None;
                    state.progress = 0;
                });
                Err(err)
            }
        }
    }

    async fn status(&self) -> AgentStatusInfo {
        let state = self.state.lock();
        self.snapshot(&state)
    }

    async fn capabilities(&self) -> Vec<Capability> {
        self.role.capabilities()
    }

    async fn execute(
        &self,
        task: &WorkflowTask,
        ctx: TaskContext,
    ) -> Result<AgentTaskResult, AgentError> {
        self.begin(task)?;
        let started = Instant::now();

        if ctx.is_cancelled() {
            return Err(self.abandon(task));
        }
        self.report(&ctx, 10);

        let request = self.build_request(task, &ctx);
        let generated = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => None,
            result = self.generator.generate(request) => Some(result),
        };

        let text = match generated {
            None => return Err(self.abandon(task)),
            Some(Err(err)) => return Err(self.fail(task, started, err.into())),
            Some(Ok(text)) if text.trim().is_empty() => {
                let err = GenerationError::EmptyResponse(self.generator.id().to_string());
                return Err(self.fail(task, started, err.into()));
            }
            Some(Ok(text)) => text,
        };

        self.report(&ctx, 90);
        if ctx.is_cancelled() {
            return Err(self.abandon(task));
        }

        let payload = serde_json::json!({
            "role": self.role.id(),
            "task_type": task.task_type,
            "content": text,
        });
        let result = AgentTaskResult::success(&task.id, &self.id, payload, started.elapsed());

        self.update(|state| {
            state.status = AgentStatus::Idle;
            state.current_task = None;
            state.progress = 0;
        });
        let _ = self.events.send(AgentEvent::TaskCompleted(result.clone()));
        Ok(result)
    }

    async fn reset(&self) -> Result<(), AgentError> {
        self.update(|state| {
            state.status = AgentStatus::Idle;
            state.current_task = None;
            state.progress = 0;
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
