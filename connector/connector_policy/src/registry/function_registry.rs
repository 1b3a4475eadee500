//! The function registry.
//!
//! Functions are registered under a scope. A scope is a delimiter-separated
//! path such as `contract.negotiation`; a function registered under a scope
//! applies to that scope and to every scope below it. Functions registered
//! under [`WILDCARD_SCOPE`] apply everywhere.

use connector_core::{EngineConfig, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::model::{Operator, Policy, PolicyContext, RuleKind, RuleRef};
use crate::registry::{
    AtomicConstraintFunction, DynamicAtomicConstraintFunction, PolicyValidator, RuleFunction,
};

/// The scope whose registrations apply to every scope.
pub const WILDCARD_SCOPE: &str = "*";

/// The registrations of one scope.
#[derive(Default)]
struct ScopeEntries {
    atomic: HashMap<String, Vec<Arc<dyn AtomicConstraintFunction>>>,
    dynamic: Vec<Arc<dyn DynamicAtomicConstraintFunction>>,
    rule: HashMap<(RuleKind, String), Vec<Arc<dyn RuleFunction>>>,
    pre_validators: Vec<Arc<dyn PolicyValidator>>,
    post_validators: Vec<Arc<dyn PolicyValidator>>,
    bindings: HashSet<String>,
}

/// Registration table mapping scopes and keys to evaluation functions.
///
/// The registry is built at startup and read during evaluation. It is an
/// ordinary value: tests construct one per scenario, and the engine shares
/// one behind a lock.
pub struct FunctionRegistry {
    delimiter: String,
    scopes: HashMap<String, ScopeEntries>,
}

impl FunctionRegistry {
    /// Create an empty registry using `.` as the scope delimiter.
    pub fn new() -> Self {
        Self::with_delimiter(".")
    }

    /// Create an empty registry with a custom scope delimiter.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            scopes: HashMap::new(),
        }
    }

    /// Create an empty registry configured from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_delimiter(config.scope_delimiter.clone())
    }

    /// The scope delimiter.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The scopes whose registrations apply to `scope`, most general first.
    ///
    /// For `a.b` this is `*`, `a`, `a.b`.
    pub fn scope_chain<'s>(&self, scope: &'s str) -> Vec<&'s str> {
        let mut chain = vec![WILDCARD_SCOPE];
        if scope == WILDCARD_SCOPE || self.delimiter.is_empty() {
            if scope != WILDCARD_SCOPE {
                chain.push(scope);
            }
            return chain;
        }
        for (index, _) in scope.match_indices(self.delimiter.as_str()) {
            if index > 0 {
                chain.push(&scope[..index]);
            }
        }
        chain.push(scope);
        chain
    }

    fn entries(&mut self, scope: &str) -> &mut ScopeEntries {
        self.scopes.entry(scope.to_string()).or_default()
    }

    fn chain_entries(&self, scope: &str) -> Vec<&ScopeEntries> {
        self.scope_chain(scope)
            .into_iter()
            .filter_map(|s| self.scopes.get(s))
            .collect()
    }

    /// Register a closure deciding atomic constraints on `key`.
    ///
    /// Registrations are additive: every function registered for a key in
    /// the scope chain must hold.
    pub fn register_atomic<F>(&mut self, scope: &str, key: &str, function: F)
    where
        F: Fn(Operator, &Value, RuleRef<'_>, &mut PolicyContext) -> bool + Send + Sync + 'static,
    {
        self.register_atomic_handler(scope, key, Arc::new(function));
    }

    /// Register a shared atomic constraint function on `key`.
    pub fn register_atomic_handler(
        &mut self,
        scope: &str,
        key: &str,
        function: Arc<dyn AtomicConstraintFunction>,
    ) {
        info!(scope, key, "Registering atomic constraint function");
        self.entries(scope)
            .atomic
            .entry(key.to_string())
            .or_default()
            .push(function);
    }

    /// Register a function deciding constraints for a family of operands.
    pub fn register_dynamic<D>(&mut self, scope: &str, function: D)
    where
        D: DynamicAtomicConstraintFunction + 'static,
    {
        info!(scope, "Registering dynamic atomic constraint function");
        self.entries(scope).dynamic.push(Arc::new(function));
    }

    /// Register a closure run for every rule of `kind` governing `action`.
    pub fn register_rule_function<F>(&mut self, scope: &str, kind: RuleKind, action: &str, function: F)
    where
        F: Fn(RuleRef<'_>, &mut PolicyContext) -> bool + Send + Sync + 'static,
    {
        self.register_rule_handler(scope, kind, action, Arc::new(function));
    }

    /// Register a shared rule function.
    pub fn register_rule_handler(
        &mut self,
        scope: &str,
        kind: RuleKind,
        action: &str,
        function: Arc<dyn RuleFunction>,
    ) {
        info!(scope, %kind, action, "Registering rule function");
        self.entries(scope)
            .rule
            .entry((kind, action.to_string()))
            .or_default()
            .push(function);
    }

    /// Register a check run before the rules of a policy are evaluated.
    pub fn register_pre_validator<F>(&mut self, scope: &str, validator: F)
    where
        F: Fn(&Policy, &mut PolicyContext) -> bool + Send + Sync + 'static,
    {
        info!(scope, "Registering pre-validator");
        self.entries(scope).pre_validators.push(Arc::new(validator));
    }

    /// Register a check run after the rules of a policy are evaluated.
    pub fn register_post_validator<F>(&mut self, scope: &str, validator: F)
    where
        F: Fn(&Policy, &mut PolicyContext) -> bool + Send + Sync + 'static,
    {
        info!(scope, "Registering post-validator");
        self.entries(scope).post_validators.push(Arc::new(validator));
    }

    /// Record that `rule_key` (a left operand or action type) is meaningful
    /// in `scope`.
    pub fn bind(&mut self, rule_key: &str, scope: &str) {
        debug!(rule_key, scope, "Binding rule key to scope");
        self.entries(scope).bindings.insert(rule_key.to_string());
    }

    /// Whether `rule_key` is bound to `scope` or to one of its ancestors.
    pub fn is_in_scope(&self, rule_key: &str, scope: &str) -> bool {
        self.chain_entries(scope)
            .into_iter()
            .any(|entries| entries.bindings.contains(rule_key))
    }

    /// The keyed functions for `key` in the chain of `scope`.
    pub fn atomic_functions(&self, scope: &str, key: &str) -> Vec<&dyn AtomicConstraintFunction> {
        self.chain_entries(scope)
            .into_iter()
            .filter_map(|entries| entries.atomic.get(key))
            .flatten()
            .map(|function| &**function)
            .collect()
    }

    /// The dynamic function handling `key`, the most specific scope first.
    pub fn dynamic_function(
        &self,
        scope: &str,
        key: &str,
    ) -> Option<&dyn DynamicAtomicConstraintFunction> {
        self.scope_chain(scope)
            .into_iter()
            .rev()
            .filter_map(|s| self.scopes.get(s))
            .flat_map(|entries| entries.dynamic.iter())
            .find(|function| function.can_handle(key))
            .map(|function| &**function)
    }

    /// Whether any function, keyed or dynamic, decides constraints on `key`.
    pub fn has_function(&self, scope: &str, key: &str) -> bool {
        !self.atomic_functions(scope, key).is_empty() || self.dynamic_function(scope, key).is_some()
    }

    /// The rule functions for rules of `kind` governing `action`.
    pub fn rule_functions(&self, scope: &str, kind: RuleKind, action: &str) -> Vec<&dyn RuleFunction> {
        let key = (kind, action.to_string());
        self.chain_entries(scope)
            .into_iter()
            .filter_map(|entries| entries.rule.get(&key))
            .flatten()
            .map(|function| &**function)
            .collect()
    }

    /// The pre-validators applying to `scope`.
    pub fn pre_validators(&self, scope: &str) -> Vec<&dyn PolicyValidator> {
        self.chain_entries(scope)
            .into_iter()
            .flat_map(|entries| entries.pre_validators.iter())
            .map(|validator| &**validator)
            .collect()
    }

    /// The post-validators applying to `scope`.
    pub fn post_validators(&self, scope: &str) -> Vec<&dyn PolicyValidator> {
        self.chain_entries(scope)
            .into_iter()
            .flat_map(|entries| entries.post_validators.iter())
            .map(|validator| &**validator)
            .collect()
    }

    /// The left operands with keyed functions applying to `scope`.
    pub fn atomic_keys(&self, scope: &str) -> BTreeSet<&str> {
        self.chain_entries(scope)
            .into_iter()
            .flat_map(|entries| entries.atomic.keys())
            .map(String::as_str)
            .collect()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
