//! In-memory policy store.
//!
//! This module provides an in-memory implementation of the policy store.

use connector_core::error::{PolicyError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::PolicyStore;
use crate::model::Policy;

/// An in-memory policy store.
#[derive(Clone)]
pub struct InMemoryPolicyStore {
    /// The policies, indexed by uid.
    policies: Arc<DashMap<String, Policy>>,
}

impl InMemoryPolicyStore {
    /// Create a new in-memory policy store.
    pub fn new() -> Self {
        Self {
            policies: Arc::new(DashMap::new()),
        }
    }

    /// The number of stored policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(mut policies: Vec<Policy>) -> Vec<Policy> {
    policies.sort_by(|a, b| a.uid.cmp(&b.uid));
    policies
}

impl PolicyStore for InMemoryPolicyStore {
    fn add_policy(&self, policy: Policy) -> Result<()> {
        policy.validate()?;

        if self.policies.contains_key(&policy.uid) {
            return Err(PolicyError::Conflict(policy.uid).into());
        }

        debug!(uid = %policy.uid, "Storing policy");
        self.policies.insert(policy.uid.clone(), policy);

        Ok(())
    }

    fn get_policy(&self, uid: &str) -> Result<Policy> {
        let policy = self
            .policies
            .get(uid)
            .ok_or_else(|| PolicyError::NotFound(uid.to_string()))?
            .value()
            .clone();

        Ok(policy)
    }

    fn update_policy(&self, policy: Policy) -> Result<()> {
        policy.validate()?;

        if !self.policies.contains_key(&policy.uid) {
            return Err(PolicyError::NotFound(policy.uid).into());
        }

        self.policies.insert(policy.uid.clone(), policy);

        Ok(())
    }

    fn remove_policy(&self, uid: &str) -> Result<()> {
        if self.policies.remove(uid).is_none() {
            return Err(PolicyError::NotFound(uid.to_string()).into());
        }

        Ok(())
    }

    fn list_policies(&self) -> Result<Vec<Policy>> {
        let policies = self.policies.iter().map(|p| p.value().clone()).collect();

        Ok(sorted(policies))
    }

    fn list_policies_matching<F>(&self, matcher: F) -> Result<Vec<Policy>>
    where
        F: Fn(&Policy) -> bool,
    {
        let policies = self
            .policies
            .iter()
            .map(|p| p.value().clone())
            .filter(|p| matcher(p))
            .collect();

        Ok(sorted(policies))
    }

    fn clear_policies(&self) -> Result<()> {
        self.policies.clear();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constraint, Operator, Permission, Prohibition};
    use connector_core::Error;

    fn policy(uid: &str) -> Policy {
        Policy::with_uid(uid).permit(
            Permission::new("use").with_constraint(Constraint::atomic("region", Operator::Eq, "EU")),
        )
    }

    #[test]
    fn test_add_and_get_policy() {
        let store = InMemoryPolicyStore::new();
        store.add_policy(policy("policy-1")).unwrap();

        let stored = store.get_policy("policy-1").unwrap();
        assert_eq!(stored, policy("policy-1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_conflict() {
        let store = InMemoryPolicyStore::new();
        store.add_policy(policy("policy-1")).unwrap();

        let result = store.add_policy(policy("policy-1"));
        assert!(matches!(result, Err(Error::Policy(PolicyError::Conflict(_)))));
    }

    #[test]
    fn test_add_rejects_malformed() {
        let store = InMemoryPolicyStore::new();
        let malformed = Policy::with_uid("bad").permit(Permission::new(" "));

        let result = store.add_policy(malformed);
        assert!(matches!(result, Err(Error::Policy(PolicyError::Malformed(_)))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_policy() {
        let store = InMemoryPolicyStore::new();
        store.add_policy(policy("policy-1")).unwrap();

        let updated = policy("policy-1").prohibit(Prohibition::new("distribute"));
        store.update_policy(updated.clone()).unwrap();
        assert_eq!(store.get_policy("policy-1").unwrap(), updated);

        let result = store.update_policy(policy("policy-2"));
        assert!(matches!(result, Err(Error::Policy(PolicyError::NotFound(_)))));
    }

    #[test]
    fn test_remove_policy() {
        let store = InMemoryPolicyStore::new();
        store.add_policy(policy("policy-1")).unwrap();
        store.remove_policy("policy-1").unwrap();

        assert!(store.get_policy("policy-1").is_err());
        assert!(store.remove_policy("policy-1").is_err());
    }

    #[test]
    fn test_list_policies() {
        let store = InMemoryPolicyStore::new();
        store.add_policy(policy("policy-b")).unwrap();
        store.add_policy(policy("policy-a")).unwrap();
        store
            .add_policy(policy("policy-c").prohibit(Prohibition::new("distribute")))
            .unwrap();

        let uids: Vec<_> = store
            .list_policies()
            .unwrap()
            .into_iter()
            .map(|p| p.uid)
            .collect();
        assert_eq!(uids, vec!["policy-a", "policy-b", "policy-c"]);

        let matching = store
            .list_policies_matching(|p| !p.prohibitions.is_empty())
            .unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].uid, "policy-c");

        store.clear_policies().unwrap();
        assert!(store.list_policies().unwrap().is_empty());
    }
}
