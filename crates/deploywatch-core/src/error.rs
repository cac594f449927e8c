//! Error types for deploywatch configuration.

use thiserror::Error;

/// Result type alias for config loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while resolving a `MonitorConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
