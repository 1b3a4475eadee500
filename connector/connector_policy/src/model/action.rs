//! Rule actions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Constraint;

/// The action a rule permits, prohibits or obliges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// The action identifier, such as `"use"`.
    #[serde(rename = "type")]
    pub action_type: String,

    /// A broader action this action is a specialization of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_in: Option<String>,

    /// Narrows when this action applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Box<Constraint>>,
}

impl Action {
    /// Create an action of the given type.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            included_in: None,
            constraint: None,
        }
    }

    /// Declare this action a specialization of `broader`.
    pub fn included_in(mut self, broader: impl Into<String>) -> Self {
        self.included_in = Some(broader.into());
        self
    }

    /// Attach a refinement constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(Box::new(constraint));
        self
    }

    /// Whether a rule carrying this action governs a request for `requested`.
    ///
    /// A rule covers its own action type and every action that declares
    /// itself included in that type.
    pub fn covers(&self, requested: &Action) -> bool {
        self.action_type == requested.action_type
            || requested.included_in.as_deref() == Some(self.action_type.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action_type)
    }
}

impl From<&str> for Action {
    fn from(action_type: &str) -> Self {
        Self::new(action_type)
    }
}
