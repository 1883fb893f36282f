//! Story-writing agents for Storyloom.
//!
//! One [`StoryAgent`] implementation serves every [`Role`]; the role decides
//! capabilities and prompt assembly, a [`TextGenerator`] does the writing.
//!
//! [`TextGenerator`]: storyloom_protocols::TextGenerator

mod agent;
mod generator;
mod role;

use std::sync::Arc;

use storyloom_protocols::generator::TextGenerator;

pub use agent::{GenerationSettings, StoryAgent};
pub use generator::SimulatedGenerator;
pub use role::Role;

/// One agent per role, in [`Role::ALL`] order.
pub fn standard_roster(generator: Arc<dyn TextGenerator>) -> Vec<Arc<StoryAgent>> {
    Role::ALL
        .iter()
        .map(|role| Arc::new(StoryAgent::new(*role, generator.clone())))
        .collect()
}
