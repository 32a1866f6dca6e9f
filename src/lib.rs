//! # decisis
//!
//! Deterministic policy decision point (PDP): given a principal, a resource
//! and a set of actions, returns an allow/deny decision per action.
//!
//! ## Features
//!
//! - **Scoped policies** over dotted hierarchies (`acme.corp.eng`) with
//!   most-specific-first precedence and a global fallback
//! - **Derived roles** computed from parent-role patterns and CEL
//!   conditions, with load-time cycle detection over the dependency graph
//! - **Principal policy overrides** that win outright over resource policies
//! - **Deny-overrides combining** with default deny: the engine fails
//!   closed on missing policies and on evaluation errors
//! - **Bounded caches** (scope chains, derived roles, whole decisions) with
//!   TTL expiry, cleared wholesale on reload
//! - **Lock-free reads** of an immutable policy index swapped atomically on
//!   reload
//!
//! ## Example
//!
//! ```rust
//! use decisis::{
//!     CheckRequest, DecisionEngine, Effect, EngineConfig, PolicyBundle, Principal, Resource,
//!     ResourcePolicy, Rule,
//! };
//!
//! # fn main() -> decisis::Result<()> {
//! let engine = DecisionEngine::new(EngineConfig::default());
//!
//! engine.load(PolicyBundle::default().with_resource_policy(
//!     ResourcePolicy::new("document", "default")
//!         .with_scope("acme.eng")
//!         .with_rule(
//!             Rule::new("allow-view", Effect::Allow)
//!                 .with_actions(["view"])
//!                 .with_roles(["viewer"]),
//!         ),
//! ))?;
//!
//! let request = CheckRequest::new(
//!     Principal::new("user:1").with_role("viewer").with_scope("acme"),
//!     Resource::new("document", "d1").with_scope("acme.eng"),
//!     ["view", "edit"],
//! );
//!
//! let result = engine.check(&request);
//! assert!(result.allowed("view"));
//! assert!(!result.allowed("edit")); // default deny
//! # Ok(())
//! # }
//! ```

pub mod cel;
pub mod derived_roles;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod policy;
pub mod scope;
pub mod types;

pub use cel::{CelError, CelEvaluator, ConditionEvaluator, EvalContext};
pub use derived_roles::{DerivedRoleDef, DerivedRolesResolver, ResolvedRoles, RoleOutcome, RoleTrace};
pub use engine::{
    ActionDecision, AuditRecord, CheckResult, DecisionEngine, EngineConfig, PolicyBundle,
};
pub use error::{AuthzError, Result};
pub use policy::{Effect, PolicyStore, PrincipalPolicy, PrincipalRule, ResourcePolicy, Rule};
pub use scope::{Scope, ScopeConfig, ScopeError, ScopeResolver};
pub use types::{CheckRequest, Principal, Resource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
