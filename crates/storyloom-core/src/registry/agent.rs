//! Agent registry implementation.
//!
//! The registry is the single owner of every agent instance. The queue and
//! the engine look agents up by ID and never hold them beyond a dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tracing::debug;

use storyloom_protocols::agent::Agent;

use crate::error::RegistryError;

struct Entry {
    seq: u64,
    agent: Arc<dyn Agent>,
}

/// Registry for managing agents by ID.
///
/// Mutated at startup through [`register`](Self::register); read-only while
/// workflows execute.
pub struct AgentRegistry {
    agents: DashMap<String, Entry>,
    next_seq: AtomicU64,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register an agent.
    ///
    /// Returns an error if an agent with the same ID is already registered.
    pub fn register(&self, agent: Arc<dyn Agent>) -> Result<(), RegistryError> {
        let id = agent.id().to_string();

        match self.agents.entry(id.clone()) {
            MapEntry::Occupied(_) => Err(RegistryError::AlreadyRegistered(id)),
            MapEntry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                debug!("Registering agent: {}", id);
                slot.insert(Entry { seq, agent });
                Ok(())
            }
        }
    }

    /// Get an agent by ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(id).map(|entry| entry.agent.clone())
    }

    /// Check if an agent with the given ID is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// All agents in registration order.
    pub fn list(&self) -> Vec<Arc<dyn Agent>> {
        let mut entries: Vec<(u64, Arc<dyn Agent>)> = self
            .agents
            .iter()
            .map(|entry| (entry.seq, entry.agent.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, agent)| agent).collect()
    }

    /// Get the number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
