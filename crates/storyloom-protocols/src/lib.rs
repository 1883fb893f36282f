//! # Storyloom Protocols
//!
//! Core protocol definitions for the Storyloom orchestration engine.
//! Contains the contracts shared by every other crate and no behaviour of
//! its own.
//!
//! ## Core Traits
//!
//! - [`Agent`] - A named, stateful unit of capability executing one task at a time
//! - [`TextGenerator`] - The LLM provider boundary agents delegate generation to
//!
//! ## Data Types
//!
//! - [`WorkflowTask`] / [`TaskStatus`] - The smallest dispatchable unit of work
//! - [`WorkflowDefinition`] / [`WorkflowStatus`] - An instantiated task graph
//! - [`OrchestrationEvent`] - Notifications published to observers

pub mod agent;
pub mod error;
pub mod event;
pub mod generator;
pub mod task;
pub mod types;
pub mod workflow;

// Re-export core traits
pub use agent::{
    Agent, AgentEvent, AgentStatus, AgentStatusInfo, AgentTaskResult, Capability,
    ProgressReporter, TaskContext, UpstreamOutput,
};
pub use error::{AgentError, GenerationError};
pub use event::OrchestrationEvent;
pub use generator::{GenerationRequest, TextGenerator};
pub use task::{TaskStatus, WorkflowTask};
pub use types::*;
pub use workflow::{WorkflowDefinition, WorkflowResult, WorkflowStatus};
