//! Policy auditing.
//!
//! This module records policy evaluations per policy.

/// Default number of policies tracked before eviction.
pub const DEFAULT_MAX_POLICIES: usize = 10_000;

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::model::{Decision, Evaluation};

/// A policy audit.
///
/// This audit keeps a bounded history of evaluations for each policy. The
/// oldest entries are dropped first. The number of policies tracked is
/// bounded too: recording a new policy beyond the limit evicts the policy
/// whose latest evaluation is oldest.
#[derive(Clone)]
pub struct PolicyAudit {
    /// The audit entries, keyed by policy uid.
    entries: Arc<DashMap<String, Vec<Evaluation>>>,

    /// The maximum number of entries to keep per policy.
    max_entries_per_policy: usize,

    /// The maximum number of policies to track.
    max_policies: usize,
}

impl PolicyAudit {
    /// Create a new policy audit.
    ///
    /// # Arguments
    ///
    /// * `max_entries_per_policy` - The maximum number of entries to keep
    ///   per policy. Zero disables recording.
    ///
    /// # Returns
    ///
    /// A new policy audit.
    pub fn new(max_entries_per_policy: usize) -> Self {
        Self::with_policy_limit(max_entries_per_policy, DEFAULT_MAX_POLICIES)
    }

    /// Create a policy audit tracking at most `max_policies` policies.
    ///
    /// # Arguments
    ///
    /// * `max_entries_per_policy` - The maximum number of entries to keep
    ///   per policy. Zero disables recording.
    /// * `max_policies` - The maximum number of policies to track. Zero
    ///   disables recording.
    pub fn with_policy_limit(max_entries_per_policy: usize, max_policies: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries_per_policy,
            max_policies,
        }
    }

    /// The maximum number of entries kept per policy.
    pub fn capacity(&self) -> usize {
        self.max_entries_per_policy
    }

    /// Record an evaluation.
    ///
    /// # Arguments
    ///
    /// * `evaluation` - The evaluation to record.
    pub fn record(&self, evaluation: Evaluation) {
        if self.max_entries_per_policy == 0 || self.max_policies == 0 {
            return;
        }

        if !self.entries.contains_key(&evaluation.policy_uid) {
            self.evict_to(self.max_policies - 1);
        }

        let mut policy_entries = self
            .entries
            .entry(evaluation.policy_uid.clone())
            .or_default();
        policy_entries.push(evaluation);

        if policy_entries.len() > self.max_entries_per_policy {
            let to_remove = policy_entries.len() - self.max_entries_per_policy;
            policy_entries.drain(0..to_remove);
        }
    }

    /// The number of policies with recorded evaluations.
    pub fn policy_count(&self) -> usize {
        self.entries.len()
    }

    /// Evict least recently evaluated policies until at most `limit` remain.
    fn evict_to(&self, limit: usize) {
        while self.entries.len() > limit {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().last().map(|evaluation| evaluation.timestamp))
                .map(|entry| entry.key().clone());
            match oldest {
                Some(uid) => {
                    debug!(policy = %uid, "Evicting policy from audit");
                    self.entries.remove(&uid);
                }
                None => break,
            }
        }
    }

    /// Get evaluations for a policy, oldest first.
    ///
    /// # Arguments
    ///
    /// * `policy_uid` - The uid of the policy to get evaluations for.
    ///
    /// # Returns
    ///
    /// The recorded evaluations, empty if none were recorded.
    pub fn get_evaluations(&self, policy_uid: &str) -> Vec<Evaluation> {
        self.entries
            .get(policy_uid)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// Clear evaluations for a policy.
    pub fn clear_evaluations(&self, policy_uid: &str) {
        self.entries.remove(policy_uid);
    }

    /// Get all evaluations, ordered by timestamp.
    pub fn get_all_evaluations(&self) -> Vec<Evaluation> {
        let mut evaluations: Vec<Evaluation> = self
            .entries
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        evaluations.sort_by_key(|evaluation| evaluation.timestamp);
        evaluations
    }

    /// Get evaluations that reached `decision`.
    pub fn get_evaluations_by_decision(&self, decision: Decision) -> Vec<Evaluation> {
        let mut evaluations: Vec<Evaluation> = self
            .entries
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|evaluation| evaluation.result.decision == decision)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        evaluations.sort_by_key(|evaluation| evaluation.timestamp);
        evaluations
    }

    /// Get evaluations performed in `scope`.
    pub fn get_evaluations_by_scope(&self, scope: &str) -> Vec<Evaluation> {
        let mut evaluations: Vec<Evaluation> = self
            .entries
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|evaluation| evaluation.scope == scope)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        evaluations.sort_by_key(|evaluation| evaluation.timestamp);
        evaluations
    }
}

impl Default for PolicyAudit {
    fn default() -> Self {
        Self::new(1000)
    }
}
