//! Policy evaluator.
//!
//! This module walks a policy's rules and constraint trees for one request,
//! dispatching atomic constraints and rules to the function registry.

use connector_core::{DutyEnforcement, PolicyError, Result};
use tracing::{debug, debug_span, trace, warn};

use crate::model::{
    AndConstraint, AtomicConstraint, Constraint, Decision, Duty, EvaluationResult, Multiplicity,
    MultiplicityConstraint, OrConstraint, OutstandingDuty, Permission, Policy, PolicyContext,
    Prohibition, Rule, RuleRef, Violation, ViolationReason, XoneConstraint,
};
use crate::registry::FunctionRegistry;

/// The outcome of evaluating one rule.
#[derive(Debug, Default)]
struct RuleOutcome {
    /// Whether the constraints, the action constraint and every rule
    /// function hold.
    satisfied: bool,

    /// Explanations, reported only when the outcome is adverse.
    details: Vec<ViolationReason>,

    /// Left operands no function could decide. Always reported.
    unknown_operands: Vec<String>,
}

/// Policy evaluator.
///
/// Borrows a registry for the duration of one or more evaluations. The
/// evaluator never mutates the policy; it only writes problems into the
/// context and drains them again.
pub struct PolicyEvaluator<'r> {
    /// The registry supplying function semantics.
    registry: &'r FunctionRegistry,

    /// How unsatisfied duties affect the decision.
    duty_enforcement: DutyEnforcement,
}

impl<'r> PolicyEvaluator<'r> {
    /// Create a new evaluator.
    ///
    /// # Arguments
    ///
    /// * `registry` - The function registry.
    /// * `duty_enforcement` - How unsatisfied duties affect the decision.
    ///
    /// # Returns
    ///
    /// A new policy evaluator.
    pub fn new(registry: &'r FunctionRegistry, duty_enforcement: DutyEnforcement) -> Self {
        Self {
            registry,
            duty_enforcement,
        }
    }

    /// Evaluate a policy for the request described by `context`.
    ///
    /// # Arguments
    ///
    /// * `policy` - The policy to evaluate.
    /// * `scope` - The evaluation scope selecting registered functions.
    /// * `context` - The request context.
    ///
    /// # Returns
    ///
    /// * `Ok(EvaluationResult)` - The decision with its diagnostics. A
    ///   denied request is a regular result, not an error.
    /// * `Err` - If `scope` is empty.
    pub fn evaluate(
        &self,
        policy: &Policy,
        scope: &str,
        context: &mut PolicyContext,
    ) -> Result<EvaluationResult> {
        if scope.trim().is_empty() {
            return Err(PolicyError::InvalidScope(scope.to_string()).into());
        }

        let span = debug_span!("evaluate_policy", policy = %policy.uid, scope);
        let _enter = span.enter();

        let mut result = EvaluationResult::new(&policy.uid, scope);
        let requested = context
            .requested_action()
            .map(|action| action.action_type.clone());

        let stale = context.take_problems();
        if !stale.is_empty() {
            debug!(count = stale.len(), "Discarding problems reported before evaluation");
        }

        for validator in self.registry.pre_validators(scope) {
            if !validator.validate(policy, context) {
                warn!("Pre-validator rejected policy");
                result.violations.push(Violation::for_policy(
                    requested.as_deref(),
                    ViolationReason::PreValidatorFailed,
                ));
                push_problems(&mut result, requested.as_deref(), context);
                result.decision = Decision::Deny;
                return Ok(result);
            }
        }
        context.take_problems();

        let prohibitions: Vec<&Prohibition> = policy
            .prohibitions
            .iter()
            .filter(|prohibition| context.covers(&prohibition.action))
            .collect();
        let permissions: Vec<&Permission> = policy
            .permissions
            .iter()
            .filter(|permission| context.covers(&permission.action))
            .collect();

        let mut blocked = false;
        for prohibition in prohibitions {
            let rule = prohibition.as_rule_ref();
            let outcome = self.evaluate_rule(rule, scope, context);
            record_unknown_operands(&mut result, rule, &outcome);
            if outcome.satisfied {
                blocked = true;
                result
                    .violations
                    .push(Violation::for_rule(rule, ViolationReason::ProhibitionApplies));
                record_details(&mut result.violations, rule, outcome.details);
            }
        }

        let mut granted = false;
        let mut unsatisfied = Vec::new();
        for permission in permissions {
            let rule = permission.as_rule_ref();
            let outcome = self.evaluate_rule(rule, scope, context);
            record_unknown_operands(&mut result, rule, &outcome);
            if outcome.satisfied {
                granted = true;
                for duty in &permission.duties {
                    self.evaluate_duty(duty, scope, context, &mut result);
                }
            } else {
                unsatisfied.push(Violation::for_rule(rule, ViolationReason::PermissionUnsatisfied));
                record_details(&mut unsatisfied, rule, outcome.details);
            }
        }

        for duty in &policy.obligations {
            self.evaluate_duty(duty, scope, context, &mut result);
        }

        if !granted {
            result.violations.extend(unsatisfied);
            result.violations.push(Violation::for_policy(
                requested.as_deref(),
                ViolationReason::NoApplicablePermission,
            ));
        }

        let mut post_failed = false;
        for validator in self.registry.post_validators(scope) {
            if !validator.validate(policy, context) {
                warn!("Post-validator rejected policy");
                post_failed = true;
                result.violations.push(Violation::for_policy(
                    requested.as_deref(),
                    ViolationReason::PostValidatorFailed,
                ));
                push_problems(&mut result, requested.as_deref(), context);
            }
        }
        context.take_problems();

        let blocking_duties = self.duty_enforcement == DutyEnforcement::Blocking
            && !result.outstanding_duties.is_empty();

        result.decision = if blocked || !granted || post_failed || blocking_duties {
            Decision::Deny
        } else if !result.outstanding_duties.is_empty() {
            Decision::PermitWithObligations
        } else {
            Decision::Permit
        };

        debug!(
            decision = %result.decision,
            blocked,
            granted,
            violations = result.violations.len(),
            "Evaluated policy"
        );

        Ok(result)
    }

    /// Evaluate a duty and its consequence chain, recording every
    /// unfulfilled link as outstanding.
    fn evaluate_duty(
        &self,
        duty: &Duty,
        scope: &str,
        context: &mut PolicyContext,
        result: &mut EvaluationResult,
    ) {
        for link in duty.chain() {
            let rule = link.as_rule_ref();
            let outcome = self.evaluate_rule(rule, scope, context);
            record_unknown_operands(result, rule, &outcome);
            if !outcome.satisfied {
                result
                    .violations
                    .push(Violation::for_rule(rule, ViolationReason::DutyUnsatisfied));
                record_details(&mut result.violations, rule, outcome.details);
                result.outstanding_duties.push(OutstandingDuty::from(link));
            }
        }
    }

    /// Evaluate one rule: its constraints (AND-ed), its action constraint
    /// and every rule function registered for its kind and action.
    fn evaluate_rule(
        &self,
        rule: RuleRef<'_>,
        scope: &str,
        context: &mut PolicyContext,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();

        let constraints_hold = Multiplicity::And.combine(rule.constraints(), |constraint| {
            self.evaluate_constraint(constraint, rule, scope, context, &mut outcome)
        });

        let action_holds = match rule.action().constraint.as_deref() {
            Some(constraint) => {
                self.evaluate_constraint(constraint, rule, scope, context, &mut outcome)
            }
            None => true,
        };
        if !action_holds {
            outcome
                .details
                .push(ViolationReason::ActionConstraintUnsatisfied);
        }

        let functions = self
            .registry
            .rule_functions(scope, rule.kind(), &rule.action().action_type);
        let functions_hold = functions
            .into_iter()
            .all(|function| function.evaluate(rule, context));
        if !functions_hold {
            outcome.details.push(ViolationReason::RuleFunctionRejected);
        }

        outcome.satisfied = constraints_hold && action_holds && functions_hold;
        outcome.details.extend(
            context
                .take_problems()
                .into_iter()
                .map(ViolationReason::Problem),
        );

        debug!(rule = %rule, satisfied = outcome.satisfied, "Evaluated rule");
        outcome
    }

    fn evaluate_constraint(
        &self,
        constraint: &Constraint,
        rule: RuleRef<'_>,
        scope: &str,
        context: &mut PolicyContext,
        outcome: &mut RuleOutcome,
    ) -> bool {
        let satisfied = match constraint {
            Constraint::Atomic(atomic) => self.evaluate_atomic(atomic, rule, scope, context, outcome),
            Constraint::And(node) => self.combine(
                AndConstraint::KIND,
                node.constraints(),
                rule,
                scope,
                context,
                outcome,
            ),
            Constraint::Or(node) => self.combine(
                OrConstraint::KIND,
                node.constraints(),
                rule,
                scope,
                context,
                outcome,
            ),
            Constraint::Xone(node) => self.combine(
                XoneConstraint::KIND,
                node.constraints(),
                rule,
                scope,
                context,
                outcome,
            ),
        };
        trace!(constraint = %constraint, satisfied, "Evaluated constraint");
        satisfied
    }

    fn combine(
        &self,
        kind: Multiplicity,
        children: &[Constraint],
        rule: RuleRef<'_>,
        scope: &str,
        context: &mut PolicyContext,
        outcome: &mut RuleOutcome,
    ) -> bool {
        kind.combine(children, |child| {
            self.evaluate_constraint(child, rule, scope, context, outcome)
        })
    }

    /// Decide a leaf: every keyed function must hold; failing those, a
    /// dynamic function decides; failing that, the leaf is false.
    fn evaluate_atomic(
        &self,
        atomic: &AtomicConstraint,
        rule: RuleRef<'_>,
        scope: &str,
        context: &mut PolicyContext,
        outcome: &mut RuleOutcome,
    ) -> bool {
        let Some(key) = atomic.left_operand() else {
            let key = atomic.left_expression.to_string();
            warn!(key = %key, "Left operand is not a string literal");
            outcome.unknown_operands.push(key);
            return false;
        };
        let right = atomic.right_expression.evaluate();

        let functions = self.registry.atomic_functions(scope, key);
        if !functions.is_empty() {
            return functions
                .into_iter()
                .all(|function| function.evaluate(atomic.operator, right, rule, context));
        }

        match self.registry.dynamic_function(scope, key) {
            Some(function) => function.evaluate(key, atomic.operator, right, rule, context),
            None => {
                warn!(key, "No function registered for left operand");
                outcome.unknown_operands.push(key.to_string());
                false
            }
        }
    }
}

fn record_unknown_operands(result: &mut EvaluationResult, rule: RuleRef<'_>, outcome: &RuleOutcome) {
    for key in &outcome.unknown_operands {
        result.violations.push(Violation::for_rule(
            rule,
            ViolationReason::UnknownLeftOperand(key.clone()),
        ));
    }
}

fn record_details(violations: &mut Vec<Violation>, rule: RuleRef<'_>, details: Vec<ViolationReason>) {
    violations.extend(
        details
            .into_iter()
            .map(|reason| Violation::for_rule(rule, reason)),
    );
}

fn push_problems(result: &mut EvaluationResult, action: Option<&str>, context: &mut PolicyContext) {
    for problem in context.take_problems() {
        result
            .violations
            .push(Violation::for_policy(action, ViolationReason::Problem(problem)));
    }
}
