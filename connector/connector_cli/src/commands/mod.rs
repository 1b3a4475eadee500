//! CLI commands
//!
//! Each command has an argument struct and an `execute_*` function
//! returning the process exit code.

pub mod evaluate;
pub mod policy;

use anyhow::{Context, Result};
use connector_policy::Policy;
use std::fs;
use std::path::Path;

/// Read and validate a policy document.
pub fn read_policy(path: &Path) -> Result<Policy> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read policy {}", path.display()))?;
    Policy::from_json(&json).with_context(|| format!("invalid policy {}", path.display()))
}
