//! Request context handed to evaluation functions.

use connector_core::Value;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::model::Action;

/// The facts of one evaluation request.
///
/// Constraint functions read facts and typed data from the context and may
/// report problems into it. Problems are collected by the evaluator after
/// each rule and surface as diagnostics when the rule's outcome is adverse.
#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyContext {
    /// Named request facts, such as `region` or `purpose`.
    #[serde(default)]
    facts: BTreeMap<String, Value>,

    /// The requesting participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    participant: Option<String>,

    /// The action being requested. When unset, every rule covers the request.
    #[serde(default, rename = "action", skip_serializing_if = "Option::is_none")]
    requested_action: Option<Action>,

    #[serde(skip)]
    data: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    #[serde(skip)]
    problems: Vec<String>,
}

impl PolicyContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fact.
    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    /// Set the requesting participant.
    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    /// Set the requested action.
    pub fn with_action(mut self, action: impl Into<Action>) -> Self {
        self.requested_action = Some(action.into());
        self
    }

    /// Attach typed extension data, replacing any value of the same type.
    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.insert_data(data);
        self
    }

    /// Set a fact in place.
    pub fn set_fact(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.facts.insert(key.into(), value.into());
    }

    /// Look up a fact.
    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.facts.get(key)
    }

    /// All facts.
    pub fn facts(&self) -> &BTreeMap<String, Value> {
        &self.facts
    }

    /// The requesting participant.
    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    /// The requested action.
    pub fn requested_action(&self) -> Option<&Action> {
        self.requested_action.as_ref()
    }

    /// Set the requested action in place.
    pub fn set_requested_action(&mut self, action: Option<Action>) {
        self.requested_action = action;
    }

    /// Whether a rule carrying `action` applies to this request.
    pub fn covers(&self, action: &Action) -> bool {
        match &self.requested_action {
            Some(requested) => action.covers(requested),
            None => true,
        }
    }

    /// Store typed extension data in place.
    pub fn insert_data<T: Any + Send + Sync>(&mut self, data: T) {
        self.data.insert(TypeId::of::<T>(), Box::new(data));
    }

    /// Typed extension data, if present.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|data| data.downcast_ref::<T>())
    }

    /// Record a problem found while evaluating.
    pub fn report_problem(&mut self, problem: impl Into<String>) {
        self.problems.push(problem.into());
    }

    /// Problems reported since the last drain.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Take every pending problem.
    pub fn take_problems(&mut self) -> Vec<String> {
        std::mem::take(&mut self.problems)
    }
}

impl fmt::Debug for PolicyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyContext")
            .field("facts", &self.facts)
            .field("participant", &self.participant)
            .field("requested_action", &self.requested_action)
            .field("data", &self.data.len())
            .field("problems", &self.problems)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TransferState(&'static str);

    #[test]
    fn test_facts_and_participant() {
        let context = PolicyContext::new()
            .with_fact("region", "EU")
            .with_participant("did:web:consumer");
        assert_eq!(context.fact("region"), Some(&Value::from("EU")));
        assert_eq!(context.fact("purpose"), None);
        assert_eq!(context.participant(), Some("did:web:consumer"));
    }

    #[test]
    fn test_typed_data() {
        let mut context = PolicyContext::new().with_data(TransferState("started"));
        assert_eq!(context.data::<TransferState>(), Some(&TransferState("started")));
        assert_eq!(context.data::<String>(), None);

        context.insert_data(TransferState("completed"));
        assert_eq!(context.data::<TransferState>(), Some(&TransferState("completed")));
    }

    #[test]
    fn test_coverage() {
        let context = PolicyContext::new();
        assert!(context.covers(&Action::new("anything")));

        let context = PolicyContext::new().with_action(Action::new("print").included_in("use"));
        assert!(context.covers(&Action::new("use")));
        assert!(context.covers(&Action::new("print")));
        assert!(!context.covers(&Action::new("distribute")));
    }

    #[test]
    fn test_problems_are_drained() {
        let mut context = PolicyContext::new();
        context.report_problem("missing fact 'region'");
        assert_eq!(context.problems().len(), 1);
        assert_eq!(context.take_problems(), vec!["missing fact 'region'".to_string()]);
        assert!(context.problems().is_empty());
    }

    #[test]
    fn test_deserialize_request_document() {
        let json = r#"{
            "participant": "did:web:consumer",
            "action": {"type": "use"},
            "facts": {"region": "EU", "level": 4}
        }"#;
        let context: PolicyContext = serde_json::from_str(json).unwrap();
        assert_eq!(context.participant(), Some("did:web:consumer"));
        assert_eq!(context.requested_action(), Some(&Action::new("use")));
        assert_eq!(context.fact("level"), Some(&Value::Integer(4)));
    }
}
