//! Registry errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::AlreadyRegistered("writer".to_string());
        assert!(err.to_string().contains("already registered"));
        assert!(err.to_string().contains("writer"));
    }
}
