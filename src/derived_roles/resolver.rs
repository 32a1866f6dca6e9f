//! Derived-role resolution with load-time validation and request caching

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::graph::RoleGraph;
use super::types::{DerivedRoleDef, RoleOutcome, RoleTrace};
use crate::cel::{ConditionEvaluator, EvalContext};
use crate::error::{AuthzError, Result};
use crate::pattern;
use crate::types::{Principal, Resource};

/// Validated definition set with its evaluation order, built once per load.
#[derive(Debug, Default)]
pub(crate) struct DefinitionSet {
    defs: HashMap<String, DerivedRoleDef>,
    order: Vec<String>,
}

impl DefinitionSet {
    pub(crate) fn build(definitions: Vec<DerivedRoleDef>) -> Result<Self> {
        let mut defs = HashMap::with_capacity(definitions.len());
        for def in &definitions {
            def.validate()?;
            if defs.insert(def.name.clone(), def.clone()).is_some() {
                return Err(AuthzError::DuplicateRole(def.name.clone()));
            }
        }

        let order = RoleGraph::from_definitions(&definitions).topological_sort()?;
        Ok(Self { defs, order })
    }

    fn get(&self, name: &str) -> Option<&DerivedRoleDef> {
        self.defs.get(name)
    }

    fn len(&self) -> usize {
        self.defs.len()
    }
}

/// Roles activated for one principal/resource pair, with the audit trace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedRoles {
    /// Derived roles that activated, in evaluation order
    pub activated: Vec<String>,

    /// Per-definition outcome for audit
    pub trace: Vec<RoleTrace>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    principal_id: String,
    resource_kind: String,
    resource_scope: String,
}

struct CachedRoles {
    resolved: ResolvedRoles,
    cached_at: Instant,
}

impl CachedRoles {
    fn new(resolved: ResolvedRoles) -> Self {
        Self {
            resolved,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Cache statistics for the derived-role cache
#[derive(Debug, Clone)]
pub struct RoleCacheStats {
    pub size: usize,
    pub capacity: usize,
    pub ttl: Duration,
}

/// Resolves derived roles for principal/resource pairs.
///
/// Definitions are validated and topologically sorted once, at load time;
/// requests walk the stored order with an accumulating role set, so chained
/// derivation works without recursion and cycles can never occur at request
/// time. Activation is a pure function of `(principal.id, resource.kind,
/// resource.scope)` and is cached under that key with a TTL.
///
/// # Examples
///
/// ```
/// use decisis::cel::CelEvaluator;
/// use decisis::derived_roles::{DerivedRoleDef, DerivedRolesResolver};
/// use decisis::{Principal, Resource};
///
/// let resolver = DerivedRolesResolver::new();
/// resolver
///     .load_definitions(vec![
///         DerivedRoleDef::new("owner", ["*"]).with_condition("R.attr.ownerId == P.id"),
///     ])
///     .unwrap();
///
/// let principal = Principal::new("u1").with_role("viewer");
/// let resource = Resource::new("doc", "d1").with_attribute("ownerId", "u1");
/// let resolved = resolver.resolve(&principal, &resource, &CelEvaluator::new());
/// assert_eq!(resolved.activated, vec!["owner"]);
/// ```
pub struct DerivedRolesResolver {
    definitions: RwLock<Arc<DefinitionSet>>,
    cache: DashMap<CacheKey, CachedRoles>,
    cache_ttl: Duration,
    cache_capacity: usize,
}

impl DerivedRolesResolver {
    /// Creates a resolver with default cache settings (60 s TTL, 10,000
    /// entries).
    pub fn new() -> Self {
        Self::with_cache_settings(Duration::from_secs(60), 10_000)
    }

    /// Creates a resolver with custom cache settings.
    pub fn with_cache_settings(cache_ttl: Duration, cache_capacity: usize) -> Self {
        Self {
            definitions: RwLock::new(Arc::new(DefinitionSet::default())),
            cache: DashMap::new(),
            cache_ttl,
            cache_capacity,
        }
    }

    /// Replaces the definition set wholesale.
    ///
    /// Validation happens before anything is swapped: on error (including
    /// [`AuthzError::CircularDependency`] naming the cycle) the previously
    /// loaded definitions stay active.
    pub fn load_definitions(&self, definitions: Vec<DerivedRoleDef>) -> Result<()> {
        let set = DefinitionSet::build(definitions)?;
        self.install(set);
        Ok(())
    }

    pub(crate) fn install(&self, set: DefinitionSet) {
        debug!(definitions = set.len(), "installing derived role definitions");
        *self.definitions.write() = Arc::new(set);
        self.cache.clear();
    }

    /// Resolves derived roles for a principal/resource pair.
    ///
    /// Never fails: a condition that errors is recorded in the trace and the
    /// role simply does not activate.
    pub fn resolve(
        &self,
        principal: &Principal,
        resource: &Resource,
        evaluator: &dyn ConditionEvaluator,
    ) -> ResolvedRoles {
        let key = CacheKey {
            principal_id: principal.id.clone(),
            resource_kind: resource.kind.clone(),
            resource_scope: resource.scope.clone(),
        };

        if let Some(entry) = self.cache.get(&key) {
            if !entry.is_expired(self.cache_ttl) {
                return entry.resolved.clone();
            }
            drop(entry);
            self.cache.remove(&key);
        }

        let set = self.definitions.read().clone();
        let resolved = self.resolve_uncached(&set, principal, resource, evaluator);

        if self.cache.len() < self.cache_capacity {
            self.cache.insert(key, CachedRoles::new(resolved.clone()));
        }

        resolved
    }

    fn resolve_uncached(
        &self,
        set: &DefinitionSet,
        principal: &Principal,
        resource: &Resource,
        evaluator: &dyn ConditionEvaluator,
    ) -> ResolvedRoles {
        let mut held: Vec<String> = principal.roles.clone();
        let mut activated = Vec::new();
        let mut trace = Vec::with_capacity(set.order.len());
        let ctx = EvalContext::from_entities(principal, resource);

        for name in &set.order {
            let Some(def) = set.get(name) else { continue };

            let parents_match = def
                .parent_roles
                .iter()
                .any(|pat| held.iter().any(|role| pattern::matches(role, pat)));
            if !parents_match {
                trace.push(RoleTrace {
                    role: name.clone(),
                    outcome: RoleOutcome::ParentsNotMatched,
                });
                continue;
            }

            let outcome = match def.condition.as_deref() {
                None => RoleOutcome::Activated,
                Some("") => RoleOutcome::Activated,
                Some(expr) => match evaluator.evaluate_bool(expr, &ctx) {
                    Ok(true) => RoleOutcome::Activated,
                    Ok(false) => RoleOutcome::ConditionFalse,
                    Err(err) => {
                        warn!(role = %name, %err, "derived role condition failed, role not granted");
                        RoleOutcome::ConditionError {
                            error: err.to_string(),
                        }
                    }
                },
            };

            if outcome == RoleOutcome::Activated {
                held.push(name.clone());
                activated.push(name.clone());
            }
            trace.push(RoleTrace {
                role: name.clone(),
                outcome,
            });
        }

        ResolvedRoles { activated, trace }
    }

    /// Clears the resolution cache.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    /// Number of loaded definitions.
    pub fn definition_count(&self) -> usize {
        self.definitions.read().len()
    }

    /// Names of loaded definitions in evaluation order.
    pub fn role_names(&self) -> Vec<String> {
        self.definitions.read().order.clone()
    }

    /// Cache statistics.
    pub fn cache_stats(&self) -> RoleCacheStats {
        RoleCacheStats {
            size: self.cache.len(),
            capacity: self.cache_capacity,
            ttl: self.cache_ttl,
        }
    }
}

impl Default for DerivedRolesResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cel::CelEvaluator;

    fn principal() -> Principal {
        Principal::new("user:alice").with_role("employee")
    }

    fn resource() -> Resource {
        Resource::new("document", "d1")
    }

    #[test]
    fn unconditional_role_activates_on_parent_match() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![DerivedRoleDef::new("manager", ["employee"])])
            .unwrap();

        let resolved = resolver.resolve(&principal(), &resource(), &CelEvaluator::new());
        assert_eq!(resolved.activated, vec!["manager"]);
        assert_eq!(
            resolved.trace,
            vec![RoleTrace {
                role: "manager".to_string(),
                outcome: RoleOutcome::Activated,
            }]
        );
    }

    #[test]
    fn chained_derivation_follows_topological_order() {
        let resolver = DerivedRolesResolver::new();
        // declared out of order; the stored topological order fixes it
        resolver
            .load_definitions(vec![
                DerivedRoleDef::new("senior_manager", ["manager"]),
                DerivedRoleDef::new("manager", ["employee"]),
            ])
            .unwrap();

        let resolved = resolver.resolve(&principal(), &resource(), &CelEvaluator::new());
        assert_eq!(resolved.activated, vec!["manager", "senior_manager"]);
    }

    #[test]
    fn any_parent_pattern_suffices() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![DerivedRoleDef::new(
                "elevated",
                ["admin:*", "employee"],
            )])
            .unwrap();

        // has "employee" but nothing under admin:*
        let resolved = resolver.resolve(&principal(), &resource(), &CelEvaluator::new());
        assert_eq!(resolved.activated, vec!["elevated"]);
    }

    #[test]
    fn unmatched_parents_recorded_in_trace() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![DerivedRoleDef::new("auditor", ["accountant"])])
            .unwrap();

        let resolved = resolver.resolve(&principal(), &resource(), &CelEvaluator::new());
        assert!(resolved.activated.is_empty());
        assert_eq!(
            resolved.trace[0].outcome,
            RoleOutcome::ParentsNotMatched
        );
    }

    #[test]
    fn condition_gates_activation() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![
                DerivedRoleDef::new("owner", ["*"]).with_condition("R.attr.ownerId == P.id"),
            ])
            .unwrap();
        let evaluator = CelEvaluator::new();

        let owned = Resource::new("document", "d1").with_attribute("ownerId", "user:alice");
        let resolved = resolver.resolve(&principal(), &owned, &evaluator);
        assert_eq!(resolved.activated, vec!["owner"]);

        let bob = Principal::new("user:bob").with_role("employee");
        let resolved = resolver.resolve(&bob, &owned, &evaluator);
        assert!(resolved.activated.is_empty());
        assert_eq!(resolved.trace[0].outcome, RoleOutcome::ConditionFalse);
    }

    #[test]
    fn condition_error_fails_closed() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![
                DerivedRoleDef::new("broken", ["*"]).with_condition("nonsense @#$"),
            ])
            .unwrap();

        let resolved = resolver.resolve(&principal(), &resource(), &CelEvaluator::new());
        assert!(resolved.activated.is_empty());
        assert!(matches!(
            resolved.trace[0].outcome,
            RoleOutcome::ConditionError { .. }
        ));
    }

    #[test]
    fn cycle_rejected_and_previous_set_kept() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![DerivedRoleDef::new("manager", ["employee"])])
            .unwrap();

        let result = resolver.load_definitions(vec![
            DerivedRoleDef::new("role_a", ["role_b"]),
            DerivedRoleDef::new("role_b", ["role_a"]),
        ]);
        assert!(matches!(
            result,
            Err(AuthzError::CircularDependency { .. })
        ));

        // previous configuration still answers
        assert_eq!(resolver.role_names(), vec!["manager"]);
        let resolved = resolver.resolve(&principal(), &resource(), &CelEvaluator::new());
        assert_eq!(resolved.activated, vec!["manager"]);
    }

    #[test]
    fn duplicate_definitions_rejected() {
        let resolver = DerivedRolesResolver::new();
        let result = resolver.load_definitions(vec![
            DerivedRoleDef::new("manager", ["employee"]),
            DerivedRoleDef::new("manager", ["contractor"]),
        ]);
        assert!(matches!(result, Err(AuthzError::DuplicateRole(_))));
    }

    #[test]
    fn resolution_is_cached_by_key() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![DerivedRoleDef::new("manager", ["employee"])])
            .unwrap();
        let evaluator = CelEvaluator::new();

        resolver.resolve(&principal(), &resource(), &evaluator);
        assert_eq!(resolver.cache_stats().size, 1);

        // same key: no new entry
        resolver.resolve(&principal(), &resource(), &evaluator);
        assert_eq!(resolver.cache_stats().size, 1);

        // different resource kind: new entry
        resolver.resolve(&principal(), &Resource::new("invoice", "i1"), &evaluator);
        assert_eq!(resolver.cache_stats().size, 2);
    }

    #[test]
    fn reload_invalidates_cache() {
        let resolver = DerivedRolesResolver::new();
        resolver
            .load_definitions(vec![DerivedRoleDef::new("manager", ["employee"])])
            .unwrap();

        resolver.resolve(&principal(), &resource(), &CelEvaluator::new());
        assert_eq!(resolver.cache_stats().size, 1);

        resolver
            .load_definitions(vec![DerivedRoleDef::new("director", ["manager"])])
            .unwrap();
        assert_eq!(resolver.cache_stats().size, 0);
    }
}
