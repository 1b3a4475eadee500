//! Policy rule model.
//!
//! This module defines permissions, prohibitions and duties. All three carry
//! an action, an ordered list of constraints (implicitly AND-ed), an optional
//! target and an optional assigner/assignee pair.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Action, Constraint};

/// The kind of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleKind {
    /// Grants an action.
    Permission,

    /// Blocks an action.
    Prohibition,

    /// Obliges an action.
    Duty,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission => write!(f, "permission"),
            Self::Prohibition => write!(f, "prohibition"),
            Self::Duty => write!(f, "duty"),
        }
    }
}

/// Accessors shared by every rule kind.
pub trait Rule: Clone {
    /// The kind of this rule.
    const KIND: RuleKind;

    /// The rule identifier, if any.
    fn uid(&self) -> Option<&str>;

    /// The party granting the rule.
    fn assigner(&self) -> Option<&str>;

    /// The party the rule applies to.
    fn assignee(&self) -> Option<&str>;

    /// The governed action.
    fn action(&self) -> &Action;

    /// The top-level constraints, all of which must hold.
    fn constraints(&self) -> &[Constraint];

    /// The asset the rule is about.
    fn target(&self) -> Option<&str>;

    /// A copy of this rule bound to `target`, including nested duties.
    fn with_target(&self, target: &str) -> Self;

    /// A borrowed, kind-tagged view of this rule.
    fn as_rule_ref(&self) -> RuleRef<'_>;
}

/// A permission to perform an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// The permission identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// The granting party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigner: Option<String>,

    /// The receiving party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// The permitted action.
    pub action: Action,

    /// The constraints under which the action is permitted.
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// The asset the permission is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Obligations that come with the permission once granted.
    #[serde(default)]
    pub duties: Vec<Duty>,
}

/// A prohibition of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prohibition {
    /// The prohibition identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// The prohibiting party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigner: Option<String>,

    /// The party the prohibition binds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// The prohibited action.
    pub action: Action,

    /// The constraints under which the action is prohibited.
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// The asset the prohibition is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// An obligation to perform an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duty {
    /// The duty identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// The party imposing the duty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigner: Option<String>,

    /// The party that must fulfil the duty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// The obliged action.
    pub action: Action,

    /// The constraints the fulfilment must meet.
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// The asset the duty is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// The duty that follows once this one is discharged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consequence: Option<Box<Duty>>,

    /// Uid of the permission this duty is attached to. A lookup key only;
    /// the permission owns the duty, never the reverse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_permission: Option<String>,
}

impl Permission {
    /// Create a permission for `action` with no constraints.
    pub fn new(action: impl Into<Action>) -> Self {
        Self {
            uid: None,
            assigner: None,
            assignee: None,
            action: action.into(),
            constraints: Vec::new(),
            target: None,
            duties: Vec::new(),
        }
    }

    /// Set the uid, re-pointing the back-references of attached duties.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self.link_duties();
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Attach a duty, recording this permission as its parent.
    pub fn with_duty(mut self, duty: Duty) -> Self {
        self.duties.push(duty);
        self.link_duties();
        self
    }

    /// Point every attached duty, including consequence chains, at this
    /// permission's uid.
    pub fn link_duties(&mut self) {
        for duty in &mut self.duties {
            duty.set_parent(self.uid.clone());
        }
    }
}

impl Prohibition {
    /// Create a prohibition of `action` with no constraints.
    pub fn new(action: impl Into<Action>) -> Self {
        Self {
            uid: None,
            assigner: None,
            assignee: None,
            action: action.into(),
            constraints: Vec::new(),
            target: None,
        }
    }

    /// Set the uid.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

impl Duty {
    /// Create a duty to perform `action` with no constraints.
    pub fn new(action: impl Into<Action>) -> Self {
        Self {
            uid: None,
            assigner: None,
            assignee: None,
            action: action.into(),
            constraints: Vec::new(),
            target: None,
            consequence: None,
            parent_permission: None,
        }
    }

    /// Set the uid.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Chain a duty to follow this one.
    pub fn with_consequence(mut self, consequence: Duty) -> Self {
        let mut consequence = consequence;
        consequence.set_parent(self.parent_permission.clone());
        self.consequence = Some(Box::new(consequence));
        self
    }

    /// This duty followed by its consequence chain.
    pub fn chain(&self) -> DutyChain<'_> {
        DutyChain { next: Some(self) }
    }

    fn set_parent(&mut self, parent: Option<String>) {
        if let Some(consequence) = self.consequence.as_mut() {
            consequence.set_parent(parent.clone());
        }
        self.parent_permission = parent;
    }
}

/// Iterator over a duty and its consequences.
pub struct DutyChain<'a> {
    next: Option<&'a Duty>,
}

impl<'a> Iterator for DutyChain<'a> {
    type Item = &'a Duty;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.consequence.as_deref();
        Some(current)
    }
}

macro_rules! rule_accessors {
    () => {
        fn uid(&self) -> Option<&str> {
            self.uid.as_deref()
        }

        fn assigner(&self) -> Option<&str> {
            self.assigner.as_deref()
        }

        fn assignee(&self) -> Option<&str> {
            self.assignee.as_deref()
        }

        fn action(&self) -> &Action {
            &self.action
        }

        fn constraints(&self) -> &[Constraint] {
            &self.constraints
        }

        fn target(&self) -> Option<&str> {
            self.target.as_deref()
        }
    };
}

impl Rule for Permission {
    const KIND: RuleKind = RuleKind::Permission;

    rule_accessors!();

    fn with_target(&self, target: &str) -> Self {
        Self {
            target: Some(target.to_string()),
            duties: self.duties.iter().map(|d| d.with_target(target)).collect(),
            ..self.clone()
        }
    }

    fn as_rule_ref(&self) -> RuleRef<'_> {
        RuleRef::Permission(self)
    }
}

impl Rule for Prohibition {
    const KIND: RuleKind = RuleKind::Prohibition;

    rule_accessors!();

    fn with_target(&self, target: &str) -> Self {
        Self {
            target: Some(target.to_string()),
            ..self.clone()
        }
    }

    fn as_rule_ref(&self) -> RuleRef<'_> {
        RuleRef::Prohibition(self)
    }
}

impl Rule for Duty {
    const KIND: RuleKind = RuleKind::Duty;

    rule_accessors!();

    fn with_target(&self, target: &str) -> Self {
        Self {
            target: Some(target.to_string()),
            consequence: self
                .consequence
                .as_ref()
                .map(|c| Box::new(c.with_target(target))),
            ..self.clone()
        }
    }

    fn as_rule_ref(&self) -> RuleRef<'_> {
        RuleRef::Duty(self)
    }
}

/// A borrowed rule of any kind, handed to evaluation functions.
#[derive(Debug, Clone, Copy)]
pub enum RuleRef<'a> {
    /// A permission.
    Permission(&'a Permission),

    /// A prohibition.
    Prohibition(&'a Prohibition),

    /// A duty.
    Duty(&'a Duty),
}

impl<'a> RuleRef<'a> {
    /// The kind of the referenced rule.
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Permission(_) => RuleKind::Permission,
            Self::Prohibition(_) => RuleKind::Prohibition,
            Self::Duty(_) => RuleKind::Duty,
        }
    }

    /// The rule identifier, if any.
    pub fn uid(&self) -> Option<&'a str> {
        match self {
            Self::Permission(rule) => rule.uid.as_deref(),
            Self::Prohibition(rule) => rule.uid.as_deref(),
            Self::Duty(rule) => rule.uid.as_deref(),
        }
    }

    /// The governed action.
    pub fn action(&self) -> &'a Action {
        match self {
            Self::Permission(rule) => &rule.action,
            Self::Prohibition(rule) => &rule.action,
            Self::Duty(rule) => &rule.action,
        }
    }

    /// The top-level constraints.
    pub fn constraints(&self) -> &'a [Constraint] {
        match self {
            Self::Permission(rule) => &rule.constraints,
            Self::Prohibition(rule) => &rule.constraints,
            Self::Duty(rule) => &rule.constraints,
        }
    }

    /// The rule target.
    pub fn target(&self) -> Option<&'a str> {
        match self {
            Self::Permission(rule) => rule.target.as_deref(),
            Self::Prohibition(rule) => rule.target.as_deref(),
            Self::Duty(rule) => rule.target.as_deref(),
        }
    }

    /// The party the rule applies to.
    pub fn assignee(&self) -> Option<&'a str> {
        match self {
            Self::Permission(rule) => rule.assignee.as_deref(),
            Self::Prohibition(rule) => rule.assignee.as_deref(),
            Self::Duty(rule) => rule.assignee.as_deref(),
        }
    }
}

impl fmt::Display for RuleRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind(), self.action())?;
        if let Some(uid) = self.uid() {
            write!(f, " ({})", uid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Operator;

    fn notify() -> Duty {
        Duty::new("notify")
            .with_uid("duty-notify")
            .with_consequence(Duty::new("compensate").with_uid("duty-compensate"))
    }

    #[test]
    fn test_duty_back_references() {
        let permission = Permission::new("use").with_duty(notify()).with_uid("perm-1");

        let chain: Vec<_> = permission.duties[0].chain().collect();
        assert_eq!(chain.len(), 2);
        for duty in chain {
            assert_eq!(duty.parent_permission.as_deref(), Some("perm-1"));
        }
    }

    #[test]
    fn test_duty_chain_order() {
        let duty = notify();
        let uids: Vec<_> = duty.chain().filter_map(|d| d.uid.as_deref()).collect();
        assert_eq!(uids, vec!["duty-notify", "duty-compensate"]);
    }

    #[test]
    fn test_with_target_rewrites_nested_duties() {
        let permission = Permission::new("use")
            .with_uid("perm-1")
            .with_constraint(Constraint::atomic("region", Operator::Eq, "EU"))
            .with_duty(notify());

        let bound = permission.with_target("asset-42");
        assert_eq!(bound.target(), Some("asset-42"));
        assert_eq!(bound.uid(), Some("perm-1"));
        assert_eq!(bound.constraints(), permission.constraints());
        for duty in bound.duties[0].chain() {
            assert_eq!(duty.target(), Some("asset-42"));
        }

        // The source is untouched.
        assert_eq!(permission.target(), None);
        assert!(permission.duties[0].chain().all(|d| d.target.is_none()));
    }

    #[test]
    fn test_prohibition_with_target() {
        let prohibition = Prohibition::new("distribute").with_uid("p-1");
        let bound = prohibition.with_target("asset-7");
        assert_eq!(bound.target(), Some("asset-7"));
        assert_eq!(bound.uid(), Some("p-1"));
    }

    #[test]
    fn test_rule_ref() {
        let prohibition = Prohibition::new("distribute").with_uid("p-1");
        let rule = prohibition.as_rule_ref();
        assert_eq!(rule.kind(), RuleKind::Prohibition);
        assert_eq!(rule.uid(), Some("p-1"));
        assert_eq!(rule.action().action_type, "distribute");
        assert_eq!(rule.to_string(), "prohibition 'distribute' (p-1)");
        assert_eq!(Duty::KIND, RuleKind::Duty);
    }

    #[test]
    fn test_permission_serialization_round_trip() {
        let permission = Permission::new("use")
            .with_uid("perm-1")
            .with_constraint(Constraint::or(vec![
                Constraint::atomic("region", Operator::Eq, "EU"),
                Constraint::atomic("region", Operator::Eq, "EEA"),
            ]))
            .with_duty(notify());

        let json = serde_json::to_string(&permission).unwrap();
        let back: Permission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, permission);
    }
}
