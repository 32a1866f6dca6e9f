//! Derived roles: relationship-based roles computed at evaluation time
//!
//! A derived role activates for a principal/resource pair when at least one
//! of its parent-role patterns matches a role the principal currently holds
//! and its condition (if any) evaluates true. Definitions may depend on each
//! other; the dependency graph is validated for cycles once at load time and
//! evaluation follows the stored topological order, so chained derivation
//! needs no recursion and no request-time re-validation.

mod graph;
mod resolver;
mod types;

pub use graph::RoleGraph;
pub use resolver::{DerivedRolesResolver, ResolvedRoles, RoleCacheStats};
pub(crate) use resolver::DefinitionSet;
pub use types::{DerivedRoleDef, RoleOutcome, RoleTrace};
