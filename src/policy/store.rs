//! Indexed policy storage with atomic reload
//!
//! Policies are indexed once into an immutable structure; readers share it
//! through an `Arc` cloned under a briefly-held read lock, so the hot path
//! never contends with a reload. A reload builds the replacement index off
//! the hot path and swaps the single reference; in-flight readers keep the
//! snapshot they started with.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{PrincipalPolicy, ResourcePolicy};
use crate::error::{AuthzError, Result};
use crate::pattern;
use crate::scope::ScopeResolver;

/// Principal policies sharing one ID pattern, keyed by scope.
#[derive(Debug, Default)]
struct PatternBucket {
    pattern: String,
    by_scope: HashMap<String, Arc<PrincipalPolicy>>,
}

/// Immutable policy index, rebuilt wholesale on every load.
#[derive(Debug, Default)]
pub(crate) struct PolicyIndex {
    /// scope -> resource kind -> policies (load order preserved)
    resource: HashMap<String, HashMap<String, Vec<Arc<ResourcePolicy>>>>,

    /// exact principal ID -> scope -> policy
    principal_exact: HashMap<String, HashMap<String, Arc<PrincipalPolicy>>>,

    /// wildcard principal IDs, in load order
    principal_patterns: Vec<PatternBucket>,

    resource_count: usize,
    principal_count: usize,
}

impl PolicyIndex {
    pub(crate) fn build(
        resource_policies: Vec<ResourcePolicy>,
        principal_policies: Vec<PrincipalPolicy>,
        scopes: &ScopeResolver,
    ) -> Result<Self> {
        let mut index = PolicyIndex::default();

        for policy in resource_policies {
            if policy.resource_kind.is_empty() {
                return Err(AuthzError::InvalidPolicy {
                    policy: policy.label(),
                    reason: "empty resource kind".to_string(),
                });
            }
            scopes.validate(&policy.scope)?;

            index
                .resource
                .entry(policy.scope.clone())
                .or_default()
                .entry(policy.resource_kind.clone())
                .or_default()
                .push(Arc::new(policy));
            index.resource_count += 1;
        }

        for policy in principal_policies {
            if policy.principal_id.is_empty() {
                return Err(AuthzError::InvalidPolicy {
                    policy: policy.label(),
                    reason: "empty principal id".to_string(),
                });
            }
            scopes.validate(&policy.scope)?;

            let scope = policy.scope.clone();
            let policy = Arc::new(policy);
            if policy.principal_id.contains('*') {
                match index
                    .principal_patterns
                    .iter_mut()
                    .find(|bucket| bucket.pattern == policy.principal_id)
                {
                    Some(bucket) => {
                        bucket.by_scope.insert(scope, policy);
                    }
                    None => {
                        let mut bucket = PatternBucket {
                            pattern: policy.principal_id.clone(),
                            by_scope: HashMap::new(),
                        };
                        bucket.by_scope.insert(scope, policy);
                        index.principal_patterns.push(bucket);
                    }
                }
            } else {
                index
                    .principal_exact
                    .entry(policy.principal_id.clone())
                    .or_default()
                    .insert(scope, policy);
            }
            index.principal_count += 1;
        }

        Ok(index)
    }
}

/// Store statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub resource_policies: usize,
    pub principal_policies: usize,
}

/// Policy store with O(1) candidate lookup and copy-on-write reload.
pub struct PolicyStore {
    index: RwLock<Arc<PolicyIndex>>,
}

impl PolicyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Arc::new(PolicyIndex::default())),
        }
    }

    /// Indexes a policy set, replacing the current one atomically.
    ///
    /// Validation happens against the new index only: on error the
    /// previously indexed policies stay active.
    pub fn index(
        &self,
        resource_policies: Vec<ResourcePolicy>,
        principal_policies: Vec<PrincipalPolicy>,
        scopes: &ScopeResolver,
    ) -> Result<()> {
        let index = PolicyIndex::build(resource_policies, principal_policies, scopes)?;
        self.install(index);
        Ok(())
    }

    pub(crate) fn install(&self, index: PolicyIndex) {
        debug!(
            resource_policies = index.resource_count,
            principal_policies = index.principal_count,
            "installing policy index"
        );
        *self.index.write() = Arc::new(index);
    }

    fn snapshot(&self) -> Arc<PolicyIndex> {
        self.index.read().clone()
    }

    /// Returns candidate resource policies for a scope chain, ordered from
    /// the most specific scope to global. The chain is expected to end with
    /// the global scope `""`, so global policies always come last. Empty
    /// when no scope level has a policy for the kind.
    pub fn find_for_scope(&self, chain: &[String], kind: &str) -> Vec<Arc<ResourcePolicy>> {
        let index = self.snapshot();
        let mut candidates = Vec::new();

        for scope in chain {
            if let Some(by_kind) = index.resource.get(scope) {
                if let Some(policies) = by_kind.get(kind) {
                    candidates.extend(policies.iter().cloned());
                }
            }
        }

        candidates
    }

    /// Finds the principal policy for an ID, walking the scope chain from
    /// most specific to global. Exact-ID entries are consulted before
    /// pattern buckets.
    pub fn find_principal_policy(
        &self,
        principal_id: &str,
        chain: &[String],
    ) -> Option<Arc<PrincipalPolicy>> {
        let index = self.snapshot();

        if let Some(by_scope) = index.principal_exact.get(principal_id) {
            for scope in chain {
                if let Some(policy) = by_scope.get(scope) {
                    return Some(policy.clone());
                }
            }
        }

        for scope in chain {
            for bucket in &index.principal_patterns {
                if pattern::matches(principal_id, &bucket.pattern) {
                    if let Some(policy) = bucket.by_scope.get(scope) {
                        return Some(policy.clone());
                    }
                }
            }
        }

        None
    }

    /// Store statistics.
    pub fn stats(&self) -> StoreStats {
        let index = self.snapshot();
        StoreStats {
            resource_policies: index.resource_count,
            principal_policies: index.principal_count,
        }
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
