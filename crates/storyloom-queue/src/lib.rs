//! # Storyloom Queue
//!
//! Task queue for the orchestration engine.
//!
//! ## Features
//!
//! - Single-owner actor: every status transition is serialized
//! - FIFO dispatch, at most one Running task per agent
//! - Dependency gating with "upstream failure" cancellation
//! - Cooperative cancellation, pause/resume, optional timeouts
//! - Synchronous status snapshots

mod actor;
pub mod error;
pub mod handle;
pub mod queue;
pub mod status;

pub use error::QueueError;
pub use handle::TaskHandle;
pub use queue::TaskQueue;
pub use status::TaskQueueStatus;
pub use storyloom_config::QueueConfig;

/// Reason recorded on tasks cancelled because a predecessor did not complete.
pub const UPSTREAM_FAILURE: &str = "upstream failure";

#[cfg(test)]
mod test_support;
