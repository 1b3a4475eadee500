//! Error types for the connector control plane.
//!
//! The root error type, `Error`, wraps the subsystem-specific errors so
//! callers can handle every failure uniformly at the top level.
//!
//! Note that a policy which is *not satisfied* is never an error: it is a
//! regular evaluation outcome. Errors are reserved for malformed input,
//! store lookups and caller misuse.

use thiserror::Error;

/// Root error type for the connector.
#[derive(Debug, Error)]
pub enum Error {
    /// Policy model and engine errors
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors related to policies.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No policy with the given uid exists
    #[error("Policy not found: {0}")]
    NotFound(String),

    /// A policy with the given uid already exists
    #[error("Policy already exists: {0}")]
    Conflict(String),

    /// The policy is structurally invalid
    #[error("Malformed policy: {0}")]
    Malformed(String),

    /// The evaluation scope is empty or otherwise unusable
    #[error("Invalid evaluation scope: '{0}'")]
    InvalidScope(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    /// The configuration source could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The configuration is semantically invalid
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

/// Result type used throughout the connector.
pub type Result<T> = std::result::Result<T, Error>;
