//! # Connector Policy
//!
//! `connector_policy` provides the usage policy engine of the dataspace
//! connector. Every contract negotiation, transfer authorization and catalog
//! filtering decision reduces to evaluating a policy for a request.
//!
//! Key concepts:
//!
//! 1. **Constraint**: A boolean predicate tree. Atomic leaves compare a named
//!    fact against an operand; AND, OR and XONE nodes combine children.
//!
//! 2. **Rule**: A permission, prohibition or duty governing an action under
//!    a list of constraints.
//!
//! 3. **Function Registry**: Maps scopes and left operands to the functions
//!    that give atomic constraints their domain meaning, and rule kinds and
//!    actions to rule functions.
//!
//! 4. **Policy Evaluation**: Walking a policy's rules for one request and
//!    producing a decision with diagnostics. Unknown left operands fail
//!    closed.

pub mod engine;
pub mod functions;
pub mod model;
pub mod registry;
pub mod scope;
pub mod store;

// Re-export key types and traits for convenience
pub use engine::{PolicyAudit, PolicyEngine, PolicyEvaluator};
pub use functions::FactComparison;
pub use model::{
    Action, Constraint, Decision, Duty, EvaluationResult, Operator, Permission, Policy,
    PolicyContext, PolicyType, Prohibition, Rule, RuleKind, RuleRef, Violation, ViolationReason,
};
pub use registry::{FunctionRegistry, WILDCARD_SCOPE};
pub use scope::ScopeFilter;
pub use store::{InMemoryPolicyStore, PolicyStore};
