//! Agent registry.

mod agent;

pub use agent::AgentRegistry;

#[cfg(test)]
pub(crate) mod test_agent;
