//! Policy aggregate.
//!
//! A policy groups permissions, prohibitions and obligations governing an
//! asset. Policies are immutable in practice: the only rewrites are the
//! copy-on-write [`Policy::with_target`] and [`Policy::retain_target`].

use connector_core::{PolicyError, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::model::{Action, Constraint, Duty, Permission, Prohibition, Rule, RuleRef};

/// The serialization type registry: every concrete variant a policy
/// document may contain.
pub const TYPE_REGISTRY: [&str; 11] = [
    "Action",
    "AndConstraint",
    "AtomicConstraint",
    "Duty",
    "LiteralExpression",
    "OrConstraint",
    "Permission",
    "Policy",
    "PolicyType",
    "Prohibition",
    "XoneConstraint",
];

/// The kind of a policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PolicyType {
    /// A set of rules with no commitment attached.
    #[default]
    Set,

    /// A policy offered by a provider.
    Offer,

    /// A policy agreed between two parties.
    Contract,
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "Set"),
            Self::Offer => write!(f, "Offer"),
            Self::Contract => write!(f, "Contract"),
        }
    }
}

fn generate_uid() -> String {
    Uuid::new_v4().to_string()
}

/// A usage policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// The policy identifier, generated when absent.
    #[serde(default = "generate_uid")]
    pub uid: String,

    /// The granted permissions.
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// The prohibitions.
    #[serde(default)]
    pub prohibitions: Vec<Prohibition>,

    /// Top-level obligations.
    #[serde(default)]
    pub obligations: Vec<Duty>,

    /// Identifier of a parent policy. Not resolved by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,

    /// The party issuing the policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigner: Option<String>,

    /// The party the policy is issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// The asset the policy governs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// The policy kind.
    #[serde(default, rename = "type")]
    pub policy_type: PolicyType,

    /// Open extension properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensible_properties: BTreeMap<String, Value>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            uid: generate_uid(),
            permissions: Vec::new(),
            prohibitions: Vec::new(),
            obligations: Vec::new(),
            inherits_from: None,
            assigner: None,
            assignee: None,
            target: None,
            policy_type: PolicyType::default(),
            extensible_properties: BTreeMap::new(),
        }
    }
}

impl Policy {
    /// Create an empty policy with a generated uid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty policy with the given uid.
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Add a permission.
    pub fn permit(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Add a prohibition.
    pub fn prohibit(mut self, prohibition: Prohibition) -> Self {
        self.prohibitions.push(prohibition);
        self
    }

    /// Add a top-level obligation.
    pub fn oblige(mut self, duty: Duty) -> Self {
        self.obligations.push(duty);
        self
    }

    /// Parse a policy from JSON and validate it.
    ///
    /// Duties attached to permissions are linked back to their parent.
    pub fn from_json(json: &str) -> connector_core::Result<Self> {
        let mut policy: Self = serde_json::from_str(json)?;
        for permission in &mut policy.permissions {
            permission.link_duties();
        }
        policy.validate()?;
        Ok(policy)
    }

    /// Serialize the policy as pretty-printed JSON.
    pub fn to_json(&self) -> connector_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every rule of the policy, including duties attached to permissions
    /// and their consequence chains.
    pub fn rules(&self) -> Vec<RuleRef<'_>> {
        let mut rules = Vec::new();
        for permission in &self.permissions {
            rules.push(permission.as_rule_ref());
            for duty in &permission.duties {
                rules.extend(duty.chain().map(Rule::as_rule_ref));
            }
        }
        rules.extend(self.prohibitions.iter().map(Rule::as_rule_ref));
        for duty in &self.obligations {
            rules.extend(duty.chain().map(Rule::as_rule_ref));
        }
        rules
    }

    /// Look up the permission a duty is attached to.
    pub fn parent_permission(&self, duty: &Duty) -> Option<&Permission> {
        let parent = duty.parent_permission.as_deref()?;
        self.permissions
            .iter()
            .find(|permission| permission.uid.as_deref() == Some(parent))
    }

    /// A deep copy with every rule's target, and the policy target, set to
    /// `target`.
    pub fn with_target(&self, target: &str) -> Self {
        Self {
            permissions: self.permissions.iter().map(|p| p.with_target(target)).collect(),
            prohibitions: self.prohibitions.iter().map(|p| p.with_target(target)).collect(),
            obligations: self.obligations.iter().map(|d| d.with_target(target)).collect(),
            target: Some(target.to_string()),
            ..self.clone()
        }
    }

    /// A copy keeping only the rules that target `target` or carry no target.
    pub fn retain_target(&self, target: &str) -> Self {
        let matches = |rule_target: Option<&str>| rule_target.map_or(true, |t| t == target);
        Self {
            permissions: self
                .permissions
                .iter()
                .filter(|p| matches(p.target()))
                .cloned()
                .collect(),
            prohibitions: self
                .prohibitions
                .iter()
                .filter(|p| matches(p.target()))
                .cloned()
                .collect(),
            obligations: self
                .obligations
                .iter()
                .filter(|d| matches(d.target()))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Check the structural well-formedness of the policy.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.uid.trim().is_empty() {
            return Err(PolicyError::Malformed("policy uid is empty".to_string()));
        }
        for rule in self.rules() {
            validate_action(rule.action()).map_err(|reason| malformed(&rule, reason))?;
            for constraint in rule.constraints() {
                constraint
                    .validate()
                    .map_err(|reason| malformed(&rule, reason))?;
            }
        }
        Ok(())
    }

    /// Whether the policy holds no rules.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.prohibitions.is_empty() && self.obligations.is_empty()
    }
}

fn validate_action(action: &Action) -> Result<(), String> {
    if action.action_type.trim().is_empty() {
        return Err("action type is empty".to_string());
    }
    match action.constraint.as_deref() {
        Some(constraint) => Constraint::validate(constraint),
        None => Ok(()),
    }
}

fn malformed(rule: &RuleRef<'_>, reason: String) -> PolicyError {
    PolicyError::Malformed(format!("{}: {}", rule, reason))
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} permissions, {} prohibitions, {} obligations)",
            self.policy_type,
            self.uid,
            self.permissions.len(),
            self.prohibitions.len(),
            self.obligations.len()
        )
    }
}
