//! # Storyloom Workflow
//!
//! Builtin workflow templates and the engine that runs them on the task
//! queue.
//!
//! ## Components
//!
//! - [`templates`] - Template catalogue, parameter schemas and rendering
//! - [`WorkflowEngine`] - Instantiates templates and drives workflows to completion
//! - [`Orchestrator`] - Wires registry, event bus, queue and engine from configuration

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod templates;

pub use engine::{AgentSummary, WorkflowEngine};
pub use error::WorkflowError;
pub use orchestrator::Orchestrator;
pub use templates::{ParamKind, ParamSpec, StepTemplate, WorkflowTemplate};
