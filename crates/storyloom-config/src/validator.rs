//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::Invalid {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_engine(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_agents(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        if config.engine.event_capacity == 0 {
            result.add_error(ValidationError::new(
                "engine.event_capacity",
                "event_capacity must be greater than 0",
            ));
        }
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        let queue = &config.queue;
        if queue.dispatch_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "queue.dispatch_interval_ms",
                "dispatch_interval_ms must be greater than 0",
            ));
        }

        if queue.dispatch_interval_ms > 5_000 {
            result.add_warning(ValidationWarning::new(
                "queue.dispatch_interval_ms",
                "dispatch_interval_ms is very high (>5000), queued tasks may start late",
            ));
        }

        if queue.max_concurrent_tasks == Some(0) {
            result.add_error(ValidationError::new(
                "queue.max_concurrent_tasks",
                "max_concurrent_tasks must be greater than 0 when set",
            ));
        }

        if queue.task_timeout_secs == Some(0) {
            result.add_error(ValidationError::new(
                "queue.task_timeout_secs",
                "task_timeout_secs must be greater than 0 when set",
            ));
        }
    }

    fn validate_agents(config: &Config, result: &mut ValidationResult) {
        for (id, entry) in &config.agents {
            if let Some(value) = entry.settings.get("temperature") {
                match value.as_f64() {
                    Some(t) if (0.0..=2.0).contains(&t) => {}
                    _ => result.add_error(ValidationError::new(
                        format!("agents.{}.temperature", id),
                        "temperature must be a number between 0 and 2",
                    )),
                }
            }

            if let Some(value) = entry.settings.get("max_tokens") {
                if !value.as_u64().is_some_and(|n| n > 0) {
                    result.add_error(ValidationError::new(
                        format!("agents.{}.max_tokens", id),
                        "max_tokens must be a positive integer",
                    ));
                }
            }

            for key in ["model", "system_prompt"] {
                if entry.settings.get(key).is_some_and(|v| !v.is_string()) {
                    result.add_error(ValidationError::new(
                        format!("agents.{}.{}", id, key),
                        format!("{} must be a string", key),
                    ));
                }
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }

        if config.logging.file.is_empty() {
            result.add_error(ValidationError::new(
                "logging.file",
                "Log file name cannot be empty",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
