//! Agent errors.

use thiserror::Error;

use super::GenerationError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The configuration map handed to `initialize` was malformed.
    #[error("Agent initialization failed: {0}")]
    Initialization(String),

    /// `execute` was called while the agent was already working.
    #[error("Agent {agent_id} is busy with task {task_id}")]
    Busy { agent_id: String, task_id: String },

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Task {0} was cancelled")]
    Cancelled(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

impl AgentError {
    /// Whether this error is the cooperative-cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled(_))
    }
}
