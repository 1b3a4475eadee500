//! Shared policy engine.
//!
//! The engine owns the function registry behind a read/write lock, the
//! engine configuration and the evaluation audit. Clones share all three.

use connector_core::{EngineConfig, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::{PolicyAudit, PolicyEvaluator};
use crate::model::{Evaluation, EvaluationResult, Policy, PolicyContext};
use crate::registry::FunctionRegistry;
use crate::store::PolicyStore;

/// Thread-safe entry point for policy evaluation.
///
/// Each evaluation holds the registry's read lock for its whole walk, so
/// it sees a consistent set of functions. Registration at runtime takes
/// the write lock.
#[derive(Clone)]
pub struct PolicyEngine {
    registry: Arc<RwLock<FunctionRegistry>>,
    config: Arc<EngineConfig>,
    audit: PolicyAudit,
}

impl PolicyEngine {
    /// Create an engine with an empty registry.
    pub fn new(config: EngineConfig) -> Self {
        let registry = FunctionRegistry::from_config(&config);
        Self::with_registry(registry, config)
    }

    /// Create an engine around a populated registry.
    pub fn with_registry(registry: FunctionRegistry, config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            audit: PolicyAudit::with_policy_limit(config.audit_capacity, config.audit_max_policies),
            config: Arc::new(config),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, FunctionRegistry> {
        self.registry.read()
    }

    /// Write access to the registry, blocking until running evaluations
    /// finish.
    pub fn registry_mut(&self) -> RwLockWriteGuard<'_, FunctionRegistry> {
        self.registry.write()
    }

    /// The evaluation audit.
    pub fn audit(&self) -> &PolicyAudit {
        &self.audit
    }

    /// Evaluate a policy.
    ///
    /// # Arguments
    ///
    /// * `policy` - The policy to evaluate.
    /// * `scope` - The evaluation scope.
    /// * `context` - The request context.
    ///
    /// # Returns
    ///
    /// * `Ok(EvaluationResult)` - The decision with its diagnostics.
    /// * `Err` - If `scope` is empty.
    pub fn evaluate(
        &self,
        policy: &Policy,
        scope: &str,
        context: &mut PolicyContext,
    ) -> Result<EvaluationResult> {
        let result = {
            let registry = self.registry.read();
            PolicyEvaluator::new(&registry, self.config.duty_enforcement)
                .evaluate(policy, scope, context)?
        };

        if result.is_satisfied() {
            info!(policy = %policy.uid, scope, decision = %result.decision, "Policy satisfied");
        } else {
            warn!(
                policy = %policy.uid,
                scope,
                violations = result.violations.len(),
                "Policy denied request"
            );
        }

        self.audit.record(Evaluation::new(result.clone()));

        Ok(result)
    }

    /// Evaluate a policy held by `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - The store holding the policy.
    /// * `uid` - The policy uid.
    /// * `scope` - The evaluation scope.
    /// * `context` - The request context.
    ///
    /// # Returns
    ///
    /// * `Ok(EvaluationResult)` - The decision with its diagnostics.
    /// * `Err` - If the policy is not stored or `scope` is empty.
    pub fn evaluate_stored<S>(
        &self,
        store: &S,
        uid: &str,
        scope: &str,
        context: &mut PolicyContext,
    ) -> Result<EvaluationResult>
    where
        S: PolicyStore,
    {
        let policy = store.get_policy(uid)?;
        self.evaluate(&policy, scope, context)
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constraint, Decision, Operator, Permission};
    use crate::store::InMemoryPolicyStore;
    use connector_core::{Error, PolicyError};
    use std::thread;

    fn engine() -> PolicyEngine {
        let engine = PolicyEngine::default();
        engine
            .registry_mut()
            .register_atomic("*", "region", |operator, right, _, context| {
                context
                    .fact("region")
                    .map_or(false, |region| operator.apply(region, right))
            });
        engine
    }

    fn policy() -> Policy {
        Policy::with_uid("policy-1").permit(
            Permission::new("use").with_constraint(Constraint::atomic("region", Operator::Eq, "EU")),
        )
    }

    #[test]
    fn test_evaluate_records_audit() {
        let engine = engine();
        let mut context = PolicyContext::new().with_fact("region", "EU");

        let result = engine.evaluate(&policy(), "catalog", &mut context).unwrap();
        assert_eq!(result.decision, Decision::Permit);

        let evaluations = engine.audit().get_evaluations("policy-1");
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].scope, "catalog");
    }

    #[test]
    fn test_audit_disabled() {
        let config = EngineConfig {
            audit_capacity: 0,
            ..EngineConfig::default()
        };
        let engine = PolicyEngine::new(config);
        let mut context = PolicyContext::new();

        engine.evaluate(&policy(), "catalog", &mut context).unwrap();
        assert!(engine.audit().get_all_evaluations().is_empty());
    }

    #[test]
    fn test_evaluate_stored() {
        let engine = engine();
        let store = InMemoryPolicyStore::new();
        store.add_policy(policy()).unwrap();
        let mut context = PolicyContext::new().with_fact("region", "US");

        let result = engine
            .evaluate_stored(&store, "policy-1", "catalog", &mut context)
            .unwrap();
        assert_eq!(result.decision, Decision::Deny);

        let missing = engine.evaluate_stored(&store, "policy-9", "catalog", &mut context);
        assert!(matches!(missing, Err(Error::Policy(PolicyError::NotFound(_)))));
    }

    #[test]
    fn test_concurrent_evaluation() {
        let engine = engine();
        let policy = Arc::new(policy());

        let handles: Vec<_> = ["EU", "US", "EU", "US"]
            .into_iter()
            .map(|region| {
                let engine = engine.clone();
                let policy = Arc::clone(&policy);
                thread::spawn(move || {
                    let mut context = PolicyContext::new().with_fact("region", region);
                    engine
                        .evaluate(&policy, "catalog", &mut context)
                        .unwrap()
                        .is_satisfied()
                })
            })
            .collect();

        let outcomes: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(outcomes, vec![true, false, true, false]);
        assert_eq!(engine.audit().get_evaluations("policy-1").len(), 4);
    }

    #[test]
    fn test_runtime_registration_is_visible_to_clones() {
        let engine = PolicyEngine::default();
        let clone = engine.clone();
        let mut context = PolicyContext::new();

        let result = clone.evaluate(&policy(), "catalog", &mut context).unwrap();
        assert!(result.has_unknown_operand());

        engine
            .registry_mut()
            .register_atomic("catalog", "region", |_, _, _, _| true);
        let result = clone.evaluate(&policy(), "catalog", &mut context).unwrap();
        assert_eq!(result.decision, Decision::Permit);
    }
}
