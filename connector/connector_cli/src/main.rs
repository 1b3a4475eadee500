use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;

use commands::evaluate::{execute_evaluate, EvaluateArgs};
use commands::policy::{
    execute_bind_target, execute_types, execute_validate, BindTargetArgs, ValidateArgs,
};

/// Dataspace connector policy tool
///
/// Evaluates, validates and binds ODRL-style usage policies.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a policy for a request
    Evaluate(EvaluateArgs),

    /// Validate a policy document and print its uid
    Validate(ValidateArgs),

    /// Bind every rule of a policy to a target asset
    #[clap(name = "bind-target")]
    BindTarget(BindTargetArgs),

    /// List the serialization type registry
    Types,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match &cli.command {
        Commands::Evaluate(args) => execute_evaluate(args),
        Commands::Validate(args) => execute_validate(args),
        Commands::BindTarget(args) => execute_bind_target(args),
        Commands::Types => execute_types(),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
