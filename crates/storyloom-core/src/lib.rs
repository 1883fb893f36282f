//! # Storyloom Core
//!
//! Shared runtime pieces of the orchestration engine.
//!
//! ## Components
//!
//! - [`AgentRegistry`] - Owns every live agent, keyed by agent ID
//! - [`EventBus`] - Broadcasts [`OrchestrationEvent`](storyloom_protocols::OrchestrationEvent)s to observers

pub mod error;
pub mod events;
pub mod registry;

pub use error::RegistryError;
pub use events::EventBus;
pub use registry::AgentRegistry;
