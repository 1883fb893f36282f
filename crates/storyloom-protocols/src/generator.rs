//! Text generator trait: the boundary to the LLM provider clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// A single generation request assembled by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Agent issuing the request.
    pub agent_id: String,
    /// Task type the request serves.
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(
        agent_id: impl Into<String>,
        task_type: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            task_type: task_type.into(),
            system_prompt: None,
            prompt: prompt.into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Core trait for text generators.
///
/// Retry and backoff belong to the implementation, not to callers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the generator ID.
    fn id(&self) -> &str;

    /// Generate text for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
