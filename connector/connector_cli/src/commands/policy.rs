//! Policy document commands

use anyhow::Result;
use clap::Args;
use connector_policy::model::TYPE_REGISTRY;
use std::path::PathBuf;
use std::process::ExitCode;

use super::read_policy;

/// Arguments for the validate command
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the policy JSON document
    #[clap(long)]
    pub policy: PathBuf,
}

/// Arguments for the bind-target command
#[derive(Args)]
pub struct BindTargetArgs {
    /// Path to the policy JSON document
    #[clap(long)]
    pub policy: PathBuf,

    /// Identifier of the asset to bind
    #[clap(long)]
    pub target: String,
}

/// Implementation of the validate command
pub fn execute_validate(args: &ValidateArgs) -> Result<ExitCode> {
    let policy = read_policy(&args.policy)?;
    println!("{}", policy.uid);
    Ok(ExitCode::SUCCESS)
}

/// Implementation of the bind-target command
pub fn execute_bind_target(args: &BindTargetArgs) -> Result<ExitCode> {
    let policy = read_policy(&args.policy)?;
    println!("{}", policy.with_target(&args.target).to_json()?);
    Ok(ExitCode::SUCCESS)
}

/// Implementation of the types command
pub fn execute_types() -> Result<ExitCode> {
    for name in TYPE_REGISTRY {
        println!("{}", name);
    }
    Ok(ExitCode::SUCCESS)
}
