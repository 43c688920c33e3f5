//! Core error types for the raspe harvester.
//!
//! Input and configuration problems are reported through [`RaspeError`].
//! Transient source failures live in the harvest crate's own error type.

use thiserror::Error;

/// Central error type for caller-facing validation and setup.
#[derive(Error, Debug)]
pub enum RaspeError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bad caller input (multiple list parameters, bad dates, invalid enum value)
    #[error("validation error: {0}")]
    Validation(String),

    /// A required credential was supplied neither explicitly nor via environment
    #[error("missing credential {name}: pass it explicitly or set {env_var}")]
    Credential {
        /// Credential name
        name: String,
        /// Environment variable consulted
        env_var: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl RaspeError {
    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `RaspeError`.
pub type Result<T> = std::result::Result<T, RaspeError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
