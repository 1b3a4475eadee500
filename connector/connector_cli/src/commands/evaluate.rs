//! The evaluate command

use anyhow::{Context, Result};
use clap::Args;
use connector_core::{logging, EngineConfig};
use connector_policy::{Action, FactComparison, PolicyContext, PolicyEngine, WILDCARD_SCOPE};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use super::read_policy;

/// Exit code reported when the policy denies the request.
pub const DENIED_EXIT_CODE: u8 = 2;

/// Arguments for the evaluate command
#[derive(Args)]
pub struct EvaluateArgs {
    /// Path to the policy JSON document
    #[clap(long)]
    pub policy: PathBuf,

    /// Path to the request context JSON document
    #[clap(long)]
    pub context: Option<PathBuf>,

    /// Evaluation scope, such as `contract.negotiation`
    #[clap(long)]
    pub scope: String,

    /// Requested action type, overriding the context document
    #[clap(long)]
    pub action: Option<String>,

    /// Path to the engine configuration TOML file
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Build an engine whose fact operands compare against request facts.
///
/// With no configured operands every left operand is compared.
pub fn build_engine(config: EngineConfig) -> PolicyEngine {
    let comparison = if config.fact_operands.is_empty() {
        FactComparison::any()
    } else {
        FactComparison::new(config.fact_operands.iter().cloned())
    };

    let engine = PolicyEngine::new(config);
    engine
        .registry_mut()
        .register_dynamic(WILDCARD_SCOPE, comparison);
    engine
}

/// Implementation of the evaluate command
pub fn execute_evaluate(args: &EvaluateArgs) -> Result<ExitCode> {
    let config = EngineConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    // A subscriber may already be installed; evaluation proceeds either way.
    let _ = logging::init(&config.logging);

    let policy = read_policy(&args.policy)?;

    let mut context = match &args.context {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read context {}", path.display()))?;
            serde_json::from_str::<PolicyContext>(&json)
                .with_context(|| format!("invalid context {}", path.display()))?
        }
        None => PolicyContext::new(),
    };
    if let Some(action) = &args.action {
        context.set_requested_action(Some(Action::new(action.as_str())));
    }
    debug!(facts = context.facts().len(), "Loaded request context");

    let engine = build_engine(config);
    let result = engine.evaluate(&policy, &args.scope, &mut context)?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_satisfied() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(DENIED_EXIT_CODE))
    }
}
