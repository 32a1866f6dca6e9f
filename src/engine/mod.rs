//! Decision engine: orchestrates scope resolution, derived roles, policy
//! lookup, condition evaluation and the combining algorithm
//!
//! ```text
//! check -> effective scope -> scope chain -> derived roles
//!       -> principal policy (wins outright when matched)
//!       -> resource policies, most specific scope first
//!       -> deny-overrides combine -> per-action decision
//! ```

mod audit;
mod cache;
mod decision;

pub use audit::AuditRecord;
pub use cache::{CacheConfig, CacheStats, DecisionCache};
pub use decision::{ActionDecision, CheckResult};

use indexmap::IndexMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cel::{CelError, CelEvaluator, ConditionEvaluator, EvalContext};
use crate::derived_roles::{DefinitionSet, DerivedRoleDef, DerivedRolesResolver};
use crate::error::Result;
use crate::policy::{Effect, PolicyIndex, PolicyStore, PrincipalPolicy, ResourcePolicy};
use crate::scope::{ScopeConfig, ScopeResolver};
use crate::types::{CheckRequest, Principal, Resource};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Scope resolver configuration (depth limit, chain cache)
    pub scope: ScopeConfig,

    /// TTL for the derived-role cache
    pub role_cache_ttl: Duration,

    /// Capacity of the derived-role cache
    pub role_cache_capacity: usize,

    /// Cache whole decisions across requests
    pub enable_decision_cache: bool,

    /// Decision cache configuration
    pub decision_cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scope: ScopeConfig::default(),
            role_cache_ttl: Duration::from_secs(60),
            role_cache_capacity: 10_000,
            enable_decision_cache: true,
            decision_cache: CacheConfig::default(),
        }
    }
}

/// A complete policy configuration, loaded atomically.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBundle {
    #[serde(default)]
    pub resource_policies: Vec<ResourcePolicy>,

    #[serde(default)]
    pub principal_policies: Vec<PrincipalPolicy>,

    #[serde(default)]
    pub derived_roles: Vec<DerivedRoleDef>,
}

impl PolicyBundle {
    /// Adds a resource policy.
    pub fn with_resource_policy(mut self, policy: ResourcePolicy) -> Self {
        self.resource_policies.push(policy);
        self
    }

    /// Adds a principal policy.
    pub fn with_principal_policy(mut self, policy: PrincipalPolicy) -> Self {
        self.principal_policies.push(policy);
        self
    }

    /// Adds a derived role definition.
    pub fn with_derived_role(mut self, def: DerivedRoleDef) -> Self {
        self.derived_roles.push(def);
        self
    }
}

/// The policy decision point.
///
/// Read-mostly and safe to share across threads: the policy index is an
/// immutable snapshot swapped atomically on [`load`](Self::load), and every
/// cache is owned by the engine with an explicit lifecycle. `check` never
/// fails — evaluation errors deny the affected action and annotate its
/// decision.
pub struct DecisionEngine {
    scopes: ScopeResolver,
    roles: DerivedRolesResolver,
    policies: PolicyStore,
    evaluator: Arc<dyn ConditionEvaluator>,
    decision_cache: Option<DecisionCache>,
}

impl DecisionEngine {
    /// Creates an engine with the default CEL evaluator.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_evaluator(config, Arc::new(CelEvaluator::new()))
    }

    /// Creates an engine with a custom condition evaluator.
    pub fn with_evaluator(config: EngineConfig, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        let decision_cache = config
            .enable_decision_cache
            .then(|| DecisionCache::new(config.decision_cache.clone()));

        Self {
            scopes: ScopeResolver::new(config.scope.clone()),
            roles: DerivedRolesResolver::with_cache_settings(
                config.role_cache_ttl,
                config.role_cache_capacity,
            ),
            policies: PolicyStore::new(),
            evaluator,
            decision_cache,
        }
    }

    /// Loads a policy configuration, replacing the current one.
    ///
    /// Everything is validated before anything is swapped: a cycle in the
    /// derived-role definitions or an invalid policy leaves the previous
    /// configuration active. On success all caches are cleared.
    pub fn load(&self, bundle: PolicyBundle) -> Result<()> {
        let definitions = DefinitionSet::build(bundle.derived_roles)?;
        let index = PolicyIndex::build(
            bundle.resource_policies,
            bundle.principal_policies,
            &self.scopes,
        )?;

        self.roles.install(definitions);
        self.policies.install(index);
        self.scopes.clear_cache();
        if let Some(cache) = &self.decision_cache {
            cache.clear();
        }

        let stats = self.policies.stats();
        info!(
            resource_policies = stats.resource_policies,
            principal_policies = stats.principal_policies,
            derived_roles = self.roles.definition_count(),
            "policy configuration loaded"
        );
        Ok(())
    }

    /// Decides every requested action for the principal/resource pair.
    ///
    /// Scope and derived-role resolution run once per call and are shared by
    /// all actions; each action is then decided independently. A failure on
    /// one action (for example a broken condition) denies that action with
    /// an error annotation and leaves the others untouched.
    pub fn check(&self, request: &CheckRequest) -> CheckResult {
        let start = Instant::now();

        if let Some(cache) = &self.decision_cache {
            if let Some(hit) = cache.get(request) {
                debug!(request_id = %hit.request_id, "decision cache hit");
                return hit;
            }
        }

        let request_id = Uuid::new_v4().to_string();
        debug!(
            request_id = %request_id,
            principal = %request.principal.id,
            resource = %request.resource.kind,
            actions = request.actions.len(),
            "check"
        );

        let scope = Self::effective_scope(&request.principal, &request.resource);
        let chain = match self.scopes.build_chain(scope) {
            Ok(chain) => chain,
            Err(err) => {
                warn!(%scope, %err, "scope rejected, evaluating against global scope only");
                vec![String::new()]
            }
        };

        let resolved = self
            .roles
            .resolve(&request.principal, &request.resource, self.evaluator.as_ref());

        let mut held = request.principal.roles.clone();
        held.extend(resolved.activated.iter().cloned());

        let candidates = self.policies.find_for_scope(&chain, &request.resource.kind);
        let principal_policy = self
            .policies
            .find_principal_policy(&request.principal.id, &chain);

        debug!(
            candidates = candidates.len(),
            principal_policy = principal_policy.is_some(),
            derived_roles = resolved.activated.len(),
            "resolved request context"
        );

        let base_ctx = EvalContext::from_entities(&request.principal, &request.resource)
            .with_aux_data(request.aux_data.clone())
            .with_derived_roles(resolved.activated.clone());

        let mut decisions = IndexMap::with_capacity(request.actions.len());
        for action in &request.actions {
            let decision = self.decide_action(
                action,
                request,
                principal_policy.as_deref(),
                &candidates,
                &held,
                &resolved.activated,
                &base_ctx,
            );
            decisions.insert(action.clone(), decision);
        }

        let result = CheckResult {
            request_id,
            scope: chain.first().cloned().unwrap_or_default(),
            decisions,
            derived_roles_trace: resolved.trace,
            duration_micros: start.elapsed().as_micros() as u64,
        };

        if let Some(cache) = &self.decision_cache {
            cache.put(request, result.clone());
        }

        result
    }

    /// Convenience wrapper returning the result together with its audit
    /// record.
    pub fn check_with_audit(&self, request: &CheckRequest) -> (CheckResult, AuditRecord) {
        let result = self.check(request);
        let record = AuditRecord::from_check(request, &result);
        (result, record)
    }

    /// Statistics of the decision cache, when enabled.
    pub fn decision_cache_stats(&self) -> Option<CacheStats> {
        self.decision_cache.as_ref().map(DecisionCache::stats)
    }

    /// The engine's scope resolver.
    pub fn scopes(&self) -> &ScopeResolver {
        &self.scopes
    }

    /// The engine's derived-roles resolver.
    pub fn derived_roles(&self) -> &DerivedRolesResolver {
        &self.roles
    }

    /// The engine's policy store.
    pub fn policies(&self) -> &PolicyStore {
        &self.policies
    }

    /// Picks the scope a request is evaluated against: the deeper of the
    /// two non-empty scopes, the principal's when depths are equal, global
    /// only when both are empty.
    fn effective_scope<'a>(principal: &'a Principal, resource: &'a Resource) -> &'a str {
        if resource.scope.is_empty() {
            return &principal.scope;
        }
        if principal.scope.is_empty() {
            return &resource.scope;
        }

        let principal_depth = principal.scope.split('.').count();
        let resource_depth = resource.scope.split('.').count();
        if principal_depth >= resource_depth {
            &principal.scope
        } else {
            &resource.scope
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decide_action(
        &self,
        action: &str,
        request: &CheckRequest,
        principal_policy: Option<&PrincipalPolicy>,
        candidates: &[Arc<ResourcePolicy>],
        held_roles: &[String],
        activated: &[String],
        base_ctx: &EvalContext,
    ) -> ActionDecision {
        let ctx = base_ctx.clone().with_action(action);
        let mut error_note: Option<String> = None;

        // A matching principal policy decides outright.
        if let Some(policy) = principal_policy {
            for rule in &policy.rules {
                if !rule.matches_resource(&request.resource.kind) {
                    continue;
                }
                if !rule.matches_action(action) {
                    continue;
                }
                match self.eval_condition(rule.condition.as_deref(), &ctx) {
                    Ok(true) => {
                        debug!(
                            action,
                            policy = %policy.label(),
                            rule = %rule.name,
                            effect = ?rule.effect,
                            "principal policy decided"
                        );
                        return ActionDecision::matched(
                            rule.effect,
                            policy.label(),
                            rule.name.clone(),
                            activated.to_vec(),
                            error_note,
                        );
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(action, rule = %rule.name, %err, "principal rule condition failed");
                        note_error(&mut error_note, &rule.name, &err);
                    }
                }
            }
        }

        // Resource policies, most specific scope first. Deny-overrides: any
        // matching deny wins over an allow at any level; the first matching
        // allow is remembered for audit.
        let mut first_allow: Option<(String, String)> = None;
        for policy in candidates {
            for rule in &policy.rules {
                if !rule.matches_action(action) {
                    continue;
                }
                if !rule.matches_roles(held_roles) {
                    continue;
                }
                let matched = match self.eval_condition(rule.condition.as_deref(), &ctx) {
                    Ok(matched) => matched,
                    Err(err) => {
                        warn!(action, rule = %rule.name, %err, "rule condition failed, rule skipped");
                        note_error(&mut error_note, &rule.name, &err);
                        false
                    }
                };
                if !matched {
                    continue;
                }

                match rule.effect {
                    Effect::Deny => {
                        debug!(action, policy = %policy.label(), rule = %rule.name, "deny rule matched");
                        return ActionDecision::matched(
                            Effect::Deny,
                            policy.label(),
                            rule.name.clone(),
                            activated.to_vec(),
                            error_note,
                        );
                    }
                    Effect::Allow => {
                        if first_allow.is_none() {
                            first_allow = Some((policy.label(), rule.name.clone()));
                        }
                    }
                }
            }
        }

        match first_allow {
            Some((policy, rule)) => {
                debug!(action, policy = %policy, rule = %rule, "allow rule matched");
                ActionDecision::matched(
                    Effect::Allow,
                    policy,
                    rule,
                    activated.to_vec(),
                    error_note,
                )
            }
            None => {
                debug!(action, "no rule matched, default deny");
                ActionDecision::no_match(activated.to_vec(), error_note)
            }
        }
    }

    fn eval_condition(
        &self,
        condition: Option<&str>,
        ctx: &EvalContext,
    ) -> std::result::Result<bool, CelError> {
        match condition {
            None => Ok(true),
            Some(expr) if expr.trim().is_empty() => Ok(true),
            Some(expr) => self.evaluator.evaluate_bool(expr, ctx),
        }
    }
}

fn note_error(slot: &mut Option<String>, rule: &str, err: &CelError) {
    let message = format!("rule '{}': {}", rule, err);
    match slot {
        Some(existing) => {
            existing.push_str("; ");
            existing.push_str(&message);
        }
        None => *slot = Some(message),
    }
}
