//! Evaluation function contracts.
//!
//! Feature modules supply domain semantics through these traits. Plain
//! closures implement them through blanket impls.

use connector_core::Value;

use crate::model::{Operator, Policy, PolicyContext, RuleRef};

/// Decides an atomic constraint whose left operand has a registered key.
pub trait AtomicConstraintFunction: Send + Sync {
    /// Whether `operator right` holds for the request.
    ///
    /// # Arguments
    ///
    /// * `operator` - The constraint operator.
    /// * `right` - The evaluated right operand.
    /// * `rule` - The rule owning the constraint.
    /// * `context` - The request context.
    fn evaluate(
        &self,
        operator: Operator,
        right: &Value,
        rule: RuleRef<'_>,
        context: &mut PolicyContext,
    ) -> bool;
}

impl<F> AtomicConstraintFunction for F
where
    F: Fn(Operator, &Value, RuleRef<'_>, &mut PolicyContext) -> bool + Send + Sync,
{
    fn evaluate(
        &self,
        operator: Operator,
        right: &Value,
        rule: RuleRef<'_>,
        context: &mut PolicyContext,
    ) -> bool {
        self(operator, right, rule, context)
    }
}

/// Decides atomic constraints for a family of left operands.
///
/// Consulted only when no keyed function matches the operand.
pub trait DynamicAtomicConstraintFunction: Send + Sync {
    /// Whether this function decides constraints on `left_operand`.
    fn can_handle(&self, left_operand: &str) -> bool;

    /// Whether `left_operand operator right` holds for the request.
    fn evaluate(
        &self,
        left_operand: &str,
        operator: Operator,
        right: &Value,
        rule: RuleRef<'_>,
        context: &mut PolicyContext,
    ) -> bool;
}

/// Domain logic attached to every rule of one kind and action type.
pub trait RuleFunction: Send + Sync {
    /// Whether `rule` may take effect for the request.
    fn evaluate(&self, rule: RuleRef<'_>, context: &mut PolicyContext) -> bool;
}

impl<F> RuleFunction for F
where
    F: Fn(RuleRef<'_>, &mut PolicyContext) -> bool + Send + Sync,
{
    fn evaluate(&self, rule: RuleRef<'_>, context: &mut PolicyContext) -> bool {
        self(rule, context)
    }
}

/// A policy-level check run before or after the rules are evaluated.
pub trait PolicyValidator: Send + Sync {
    /// Whether the policy passes the check for the request.
    fn validate(&self, policy: &Policy, context: &mut PolicyContext) -> bool;
}

impl<F> PolicyValidator for F
where
    F: Fn(&Policy, &mut PolicyContext) -> bool + Send + Sync,
{
    fn validate(&self, policy: &Policy, context: &mut PolicyContext) -> bool {
        self(policy, context)
    }
}
