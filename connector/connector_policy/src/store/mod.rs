//! Policy storage.
//!
//! This module provides storage for policies.

mod in_memory;

pub use in_memory::InMemoryPolicyStore;

use crate::model::Policy;
use connector_core::error::Result;

/// Trait for policy storage.
///
/// A policy store is responsible for storing and retrieving policies by uid.
/// Stores only accept structurally valid policies.
pub trait PolicyStore: Send + Sync {
    /// Add a policy to the store.
    ///
    /// # Arguments
    ///
    /// * `policy` - The policy to add.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the policy was successfully added.
    /// * `Err` - If the policy is malformed or its uid is taken.
    fn add_policy(&self, policy: Policy) -> Result<()>;

    /// Get a policy from the store.
    ///
    /// # Arguments
    ///
    /// * `uid` - The uid of the policy to get.
    ///
    /// # Returns
    ///
    /// * `Ok(Policy)` - The policy.
    /// * `Err` - If the policy could not be found.
    fn get_policy(&self, uid: &str) -> Result<Policy>;

    /// Replace a stored policy.
    ///
    /// # Arguments
    ///
    /// * `policy` - The updated policy.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the policy was successfully updated.
    /// * `Err` - If the policy is malformed or not stored.
    fn update_policy(&self, policy: Policy) -> Result<()>;

    /// Remove a policy from the store.
    ///
    /// # Arguments
    ///
    /// * `uid` - The uid of the policy to remove.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the policy was successfully removed.
    /// * `Err` - If the policy could not be found.
    fn remove_policy(&self, uid: &str) -> Result<()>;

    /// List all policies in the store, ordered by uid.
    fn list_policies(&self) -> Result<Vec<Policy>>;

    /// List policies that match a given matcher function, ordered by uid.
    ///
    /// # Arguments
    ///
    /// * `matcher` - A function that returns `true` for policies that match.
    fn list_policies_matching<F>(&self, matcher: F) -> Result<Vec<Policy>>
    where
        F: Fn(&Policy) -> bool;

    /// Clear all policies from the store.
    fn clear_policies(&self) -> Result<()>;
}
