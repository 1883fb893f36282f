//! Text generation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Empty response from generator {0}")]
    EmptyResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::EmptyResponse("simulated".to_string());
        assert!(err.to_string().contains("simulated"));
        let err = GenerationError::Rejected("prompt too long".to_string());
        assert!(err.to_string().contains("rejected"));
    }
}
