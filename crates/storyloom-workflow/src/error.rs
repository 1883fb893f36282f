//! Workflow engine errors.

use thiserror::Error;

use storyloom_protocols::error::AgentError;
use storyloom_queue::QueueError;

/// Workflow engine errors.
///
/// Task-level failures never show up here: they end in task status and in
/// the [`WorkflowResult`](storyloom_protocols::workflow::WorkflowResult).
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Unknown workflow template: {0}")]
    UnknownTemplate(String),

    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("Agent not registered: {0}")]
    AgentNotRegistered(String),

    #[error("Invalid parameters for {template}: {message}")]
    InvalidParameters { template: String, message: String },

    #[error("Workflow {0} has already been executed")]
    AlreadyExecuted(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
