//! Function registry.
//!
//! This module maps scopes and keys to the functions giving atomic
//! constraints, rules and policies their domain meaning.

mod function;
mod function_registry;

pub use function::{
    AtomicConstraintFunction, DynamicAtomicConstraintFunction, PolicyValidator, RuleFunction,
};
pub use function_registry::{FunctionRegistry, WILDCARD_SCOPE};
