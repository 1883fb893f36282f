//! Offline text generator.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use storyloom_protocols::error::GenerationError;
use storyloom_protocols::generator::{GenerationRequest, TextGenerator};

/// Deterministic generator that echoes the shape of the request after a
/// fixed latency. Used for offline runs and tests.
pub struct SimulatedGenerator {
    latency: Duration,
    model: String,
}

impl SimulatedGenerator {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            model: "simulated".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl TextGenerator for SimulatedGenerator {
    fn id(&self) -> &str {
        "simulated"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let headline = request
            .prompt
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("Task:"))
            .or_else(|| request.prompt.lines().map(str::trim).find(|l| !l.is_empty()))
            .ok_or_else(|| GenerationError::Rejected("empty prompt".to_string()))?;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let model = request.model.as_deref().unwrap_or(&self.model);
        trace!("Simulated generation for {} ({})", request.agent_id, request.task_type);
        Ok(format!(
            "[{}] {} completed {} ({} prompt lines)",
            model,
            request.agent_id,
            headline,
            request.prompt.lines().count()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_echoes_task_line() {
        let generator = SimulatedGenerator::new(Duration::ZERO);
        let request = GenerationRequest::new(
            "writer",
            "draft_chapter",
            "Write it.\n\nTask: Draft chapter 1 (draft_chapter)\n",
        );
        let text = generator.generate(request).await.unwrap();
        assert!(text.starts_with("[simulated] writer completed Task: Draft chapter 1"));
    }

    #[tokio::test]
    async fn test_request_model_overrides_default() {
        let generator = SimulatedGenerator::new(Duration::ZERO).with_model("house");
        let mut request = GenerationRequest::new("critic", "critique", "Review this");
        assert!(generator.generate(request.clone()).await.unwrap().starts_with("[house]"));

        request.model = Some("story-large".to_string());
        assert!(generator.generate(request).await.unwrap().starts_with("[story-large]"));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let generator = SimulatedGenerator::new(Duration::ZERO);
        let request = GenerationRequest::new("reader", "read", "  \n ");
        assert!(matches!(
            generator.generate(request).await,
            Err(GenerationError::Rejected(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let generator = SimulatedGenerator::new(Duration::from_millis(200));
        let start = tokio::time::Instant::now();
        generator
            .generate(GenerationRequest::new("editor", "edit_chapter", "Task: Edit"))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
