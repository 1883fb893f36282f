//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `${VAR}` reference with no such variable in the environment.
    #[error("Config references unset variable ${{{0}}}")]
    UnsetVariable(String),

    /// Rejected by [`ConfigValidator`](crate::ConfigValidator).
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Bad substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
}
