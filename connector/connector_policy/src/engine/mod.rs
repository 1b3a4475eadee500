//! Policy evaluation engine.
//!
//! This module provides functionality for evaluating policies.

mod audit;
mod evaluator;
mod policy_engine;

pub use audit::PolicyAudit;
pub use evaluator::PolicyEvaluator;
pub use policy_engine::PolicyEngine;
