//! Policy models.
//!
//! This module defines the expression, constraint, rule and policy types,
//! the request context and the evaluation result.

pub mod action;
pub mod constraint;
pub mod context;
pub mod evaluation;
pub mod expression;
pub mod operator;
pub mod policy;
pub mod rule;

pub use action::Action;
pub use constraint::{
    AndConstraint, AtomicConstraint, Constraint, Multiplicity, MultiplicityConstraint,
    OrConstraint, XoneConstraint,
};
pub use context::PolicyContext;
pub use evaluation::{
    Decision, Evaluation, EvaluationResult, OutstandingDuty, Violation, ViolationReason,
};
pub use expression::{Expression, LiteralExpression};
pub use operator::Operator;
pub use policy::{Policy, PolicyType, TYPE_REGISTRY};
pub use rule::{Duty, DutyChain, Permission, Prohibition, Rule, RuleKind, RuleRef};
