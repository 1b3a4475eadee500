//! Policy evaluation model.
//!
//! This module defines the outcome of evaluating a policy and the audit
//! record kept for each evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Duty, RuleKind, RuleRef};

/// A policy evaluation, as recorded by the audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// The evaluated policy.
    pub policy_uid: String,

    /// The scope the policy was evaluated in.
    pub scope: String,

    /// The result of the evaluation.
    pub result: EvaluationResult,

    /// When the evaluation was performed.
    pub timestamp: DateTime<Utc>,
}

impl Evaluation {
    /// Create a new evaluation record.
    ///
    /// # Arguments
    ///
    /// * `result` - The result of the evaluation. The policy uid and scope
    ///   are taken from it.
    ///
    /// # Returns
    ///
    /// A new evaluation record stamped with the current time.
    pub fn new(result: EvaluationResult) -> Self {
        Self {
            policy_uid: result.policy_uid.clone(),
            scope: result.scope.clone(),
            result,
            timestamp: Utc::now(),
        }
    }
}

/// The overall decision for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// The requested action is allowed.
    Permit,

    /// The requested action is allowed, but duties remain outstanding.
    PermitWithObligations,

    /// The requested action is denied.
    Deny,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permit => write!(f, "Permit"),
            Self::PermitWithObligations => write!(f, "Permit with obligations"),
            Self::Deny => write!(f, "Deny"),
        }
    }
}

/// Why a violation was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ViolationReason {
    /// A prohibition covering the request is satisfied.
    ProhibitionApplies,

    /// A permission covering the request is not satisfied.
    PermissionUnsatisfied,

    /// No permission covering the request is satisfied.
    NoApplicablePermission,

    /// A duty is not fulfilled.
    DutyUnsatisfied,

    /// No function is registered for the left operand.
    UnknownLeftOperand(String),

    /// A registered rule function returned false.
    RuleFunctionRejected,

    /// The constraint refining the rule's action does not hold.
    ActionConstraintUnsatisfied,

    /// A policy-level pre-validator failed.
    PreValidatorFailed,

    /// A policy-level post-validator failed.
    PostValidatorFailed,

    /// A problem reported by an evaluation function.
    Problem(String),
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProhibitionApplies => write!(f, "prohibition applies"),
            Self::PermissionUnsatisfied => write!(f, "permission not satisfied"),
            Self::NoApplicablePermission => write!(f, "no applicable permission"),
            Self::DutyUnsatisfied => write!(f, "duty not fulfilled"),
            Self::UnknownLeftOperand(key) => write!(f, "no function for left operand '{}'", key),
            Self::RuleFunctionRejected => write!(f, "rule function rejected the rule"),
            Self::ActionConstraintUnsatisfied => write!(f, "action constraint not satisfied"),
            Self::PreValidatorFailed => write!(f, "pre-validator failed"),
            Self::PostValidatorFailed => write!(f, "post-validator failed"),
            Self::Problem(problem) => write!(f, "{}", problem),
        }
    }
}

/// A diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// The kind of the rule concerned, or `None` for policy-level records.
    pub rule_kind: Option<RuleKind>,

    /// The uid of the rule concerned.
    pub rule_uid: Option<String>,

    /// The action concerned.
    pub action: Option<String>,

    /// Why the violation was recorded.
    pub reason: ViolationReason,
}

impl Violation {
    /// A violation attributed to `rule`.
    pub fn for_rule(rule: RuleRef<'_>, reason: ViolationReason) -> Self {
        Self {
            rule_kind: Some(rule.kind()),
            rule_uid: rule.uid().map(str::to_string),
            action: Some(rule.action().action_type.clone()),
            reason,
        }
    }

    /// A policy-level violation.
    pub fn for_policy(action: Option<&str>, reason: ViolationReason) -> Self {
        Self {
            rule_kind: None,
            rule_uid: None,
            action: action.map(str::to_string),
            reason,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.rule_kind, &self.rule_uid) {
            (Some(kind), Some(uid)) => write!(f, "{} {}", kind, uid)?,
            (Some(kind), None) => write!(f, "{}", kind)?,
            _ => write!(f, "policy")?,
        }
        if let Some(action) = &self.action {
            write!(f, " [{}]", action)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// A duty left unfulfilled by an otherwise granted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingDuty {
    /// The duty uid.
    pub uid: Option<String>,

    /// The obliged action.
    pub action: String,

    /// The uid of the permission the duty is attached to.
    pub parent_permission: Option<String>,
}

impl From<&Duty> for OutstandingDuty {
    fn from(duty: &Duty) -> Self {
        Self {
            uid: duty.uid.clone(),
            action: duty.action.action_type.clone(),
            parent_permission: duty.parent_permission.clone(),
        }
    }
}

/// The result of evaluating a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// The evaluated policy.
    pub policy_uid: String,

    /// The evaluation scope.
    pub scope: String,

    /// The overall decision.
    pub decision: Decision,

    /// Diagnostics, in the order they were found.
    pub violations: Vec<Violation>,

    /// Duties that remain to be fulfilled.
    pub outstanding_duties: Vec<OutstandingDuty>,
}

impl EvaluationResult {
    /// A permitting result with no diagnostics.
    pub fn new(policy_uid: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            policy_uid: policy_uid.into(),
            scope: scope.into(),
            decision: Decision::Permit,
            violations: Vec::new(),
            outstanding_duties: Vec::new(),
        }
    }

    /// Whether the requested action may proceed.
    pub fn is_satisfied(&self) -> bool {
        self.decision != Decision::Deny
    }

    /// Whether any violation has the given reason.
    pub fn has_reason(&self, reason: &ViolationReason) -> bool {
        self.violations.iter().any(|v| &v.reason == reason)
    }

    /// Whether any left operand lacked a function.
    pub fn has_unknown_operand(&self) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v.reason, ViolationReason::UnknownLeftOperand(_)))
    }

    /// The violations recorded against the rule with `uid`.
    pub fn violations_for<'a>(&'a self, uid: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations
            .iter()
            .filter(move |v| v.rule_uid.as_deref() == Some(uid))
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} in scope '{}')", self.decision, self.policy_uid, self.scope)?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        for duty in &self.outstanding_duties {
            write!(f, "\n  * outstanding duty '{}'", duty.action)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Permission, Rule};

    #[test]
    fn test_evaluation_new() {
        let result = EvaluationResult::new("policy-1", "catalog");
        let evaluation = Evaluation::new(result.clone());

        assert_eq!(evaluation.policy_uid, "policy-1");
        assert_eq!(evaluation.scope, "catalog");
        assert_eq!(evaluation.result, result);
        assert!(evaluation.timestamp <= Utc::now());
    }

    #[test]
    fn test_is_satisfied() {
        let mut result = EvaluationResult::new("policy-1", "catalog");
        assert!(result.is_satisfied());

        result.decision = Decision::PermitWithObligations;
        assert!(result.is_satisfied());

        result.decision = Decision::Deny;
        assert!(!result.is_satisfied());
    }

    #[test]
    fn test_violation_for_rule() {
        let permission = Permission::new("use").with_uid("perm-1");
        let violation =
            Violation::for_rule(permission.as_rule_ref(), ViolationReason::PermissionUnsatisfied);

        assert_eq!(violation.rule_kind, Some(RuleKind::Permission));
        assert_eq!(violation.rule_uid.as_deref(), Some("perm-1"));
        assert_eq!(violation.action.as_deref(), Some("use"));
        assert_eq!(violation.to_string(), "permission perm-1 [use]: permission not satisfied");
    }

    #[test]
    fn test_result_queries() {
        let mut result = EvaluationResult::new("policy-1", "catalog");
        result.violations.push(Violation::for_policy(
            Some("use"),
            ViolationReason::UnknownLeftOperand("spatial".to_string()),
        ));
        assert!(result.has_unknown_operand());
        assert!(!result.has_reason(&ViolationReason::ProhibitionApplies));
        assert_eq!(result.violations_for("perm-1").count(), 0);
    }

    #[test]
    fn test_violations_for_rule_uid() {
        let permission = Permission::new("use").with_uid("perm-1");
        let mut result = EvaluationResult::new("policy-1", "catalog");
        result.violations.push(Violation::for_rule(
            permission.as_rule_ref(),
            ViolationReason::PermissionUnsatisfied,
        ));
        result
            .violations
            .push(Violation::for_policy(Some("use"), ViolationReason::NoApplicablePermission));

        let uid = format!("perm-{}", 1);
        let reasons: Vec<&ViolationReason> = result
            .violations_for(&uid)
            .map(|violation| &violation.reason)
            .collect();
        assert_eq!(reasons, vec![&ViolationReason::PermissionUnsatisfied]);
    }

    #[test]
    fn test_reason_serialized_form() {
        let json = serde_json::to_value(ViolationReason::UnknownLeftOperand("spatial".into())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "unknown_left_operand", "detail": "spatial"})
        );
        let json = serde_json::to_value(ViolationReason::ProhibitionApplies).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "prohibition_applies"}));
    }
}
