//! Scope filtering.
//!
//! Rewrites a policy so that it only mentions left operands and actions
//! bound to a scope in the function registry.

use crate::model::{
    Action, AtomicConstraint, Constraint, Duty, Permission, Policy, Prohibition,
};
use crate::registry::FunctionRegistry;

/// Rewrites policies for one scope.
///
/// Atomic constraints whose left operand is not bound to the scope are
/// pruned, rebuilding each multiplicity node with the same combinator.
/// Rules whose action type is not bound are dropped.
pub struct ScopeFilter<'r> {
    registry: &'r FunctionRegistry,
    scope: String,
}

impl<'r> ScopeFilter<'r> {
    /// Create a filter for `scope`.
    pub fn new(registry: &'r FunctionRegistry, scope: impl Into<String>) -> Self {
        Self {
            registry,
            scope: scope.into(),
        }
    }

    /// The scope this filter rewrites for.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// A copy of `policy` restricted to the scope.
    pub fn apply(&self, policy: &Policy) -> Policy {
        Policy {
            permissions: policy
                .permissions
                .iter()
                .filter_map(|permission| self.filter_permission(permission))
                .collect(),
            prohibitions: policy
                .prohibitions
                .iter()
                .filter_map(|prohibition| self.filter_prohibition(prohibition))
                .collect(),
            obligations: policy
                .obligations
                .iter()
                .filter_map(|duty| self.filter_duty(duty))
                .collect(),
            ..policy.clone()
        }
    }

    fn is_bound(&self, key: &str) -> bool {
        self.registry.is_in_scope(key, &self.scope)
    }

    fn filter_constraint(&self, constraint: &Constraint) -> Option<Constraint> {
        constraint.retain_atomic(&|atomic: &AtomicConstraint| {
            atomic.left_operand().map_or(false, |key| self.is_bound(key))
        })
    }

    fn filter_constraints(&self, constraints: &[Constraint]) -> Vec<Constraint> {
        constraints
            .iter()
            .filter_map(|constraint| self.filter_constraint(constraint))
            .collect()
    }

    fn filter_action(&self, action: &Action) -> Option<Action> {
        if !self.is_bound(&action.action_type) {
            return None;
        }
        Some(Action {
            constraint: action
                .constraint
                .as_deref()
                .and_then(|constraint| self.filter_constraint(constraint))
                .map(Box::new),
            ..action.clone()
        })
    }

    fn filter_permission(&self, permission: &Permission) -> Option<Permission> {
        Some(Permission {
            action: self.filter_action(&permission.action)?,
            constraints: self.filter_constraints(&permission.constraints),
            duties: permission
                .duties
                .iter()
                .filter_map(|duty| self.filter_duty(duty))
                .collect(),
            ..permission.clone()
        })
    }

    fn filter_prohibition(&self, prohibition: &Prohibition) -> Option<Prohibition> {
        Some(Prohibition {
            action: self.filter_action(&prohibition.action)?,
            constraints: self.filter_constraints(&prohibition.constraints),
            ..prohibition.clone()
        })
    }

    fn filter_duty(&self, duty: &Duty) -> Option<Duty> {
        Some(Duty {
            action: self.filter_action(&duty.action)?,
            constraints: self.filter_constraints(&duty.constraints),
            consequence: duty
                .consequence
                .as_deref()
                .and_then(|consequence| self.filter_duty(consequence))
                .map(Box::new),
            ..duty.clone()
        })
    }
}
