//! # Connector Core
//!
//! `connector_core` provides the building blocks shared by the crates of the
//! dataspace connector control plane: the error hierarchy, the dynamic value
//! type used for constraint operands and request facts, engine configuration,
//! and logging setup.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all connector components
//! - **value**: The dynamic `Value` type carried by literal expressions and facts
//! - **config**: Engine configuration loaded from TOML
//! - **logging**: Log levels and `tracing` subscriber installation

pub mod config;
pub mod error;
pub mod logging;
pub mod value;

// Re-export key types for convenience
pub use config::{DutyEnforcement, EngineConfig};
pub use error::{ConfigError, Error, PolicyError, Result};
pub use logging::{LogLevel, LoggingConfig};
pub use value::Value;
