//! Error types for the decision engine

use crate::cel::CelError;
use crate::scope::ScopeError;
use thiserror::Error;

/// Result type alias for decision-engine operations
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Errors surfaced by the decision engine and its components.
///
/// Load-time errors (`CircularDependency`, `DuplicateRole`,
/// `InvalidDefinition`, `InvalidPolicy`) reject the offending configuration
/// and leave the previously loaded one active. Request-time failures are
/// absorbed into per-action deny decisions and never reach callers as errors.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed or too-deep scope string
    #[error("invalid scope: {0}")]
    InvalidScope(#[from] ScopeError),

    /// Circular dependency detected between derived roles
    #[error("circular dependency in derived roles: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// Derived role name defined more than once
    #[error("duplicate derived role: {0}")]
    DuplicateRole(String),

    /// Derived role definition failed validation
    #[error("invalid derived role '{role}': {reason}")]
    InvalidDefinition { role: String, reason: String },

    /// Policy failed validation during indexing
    #[error("invalid policy '{policy}': {reason}")]
    InvalidPolicy { policy: String, reason: String },

    /// Condition expression failed to compile or evaluate
    #[error("condition evaluation failed: {0}")]
    Evaluation(#[from] CelError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthzError {
    fn from(err: anyhow::Error) -> Self {
        AuthzError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_dependency_names_the_cycle() {
        let err = AuthzError::CircularDependency {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "circular dependency in derived roles: a -> b -> a"
        );
    }

    #[test]
    fn scope_error_converts() {
        let err: AuthzError = ScopeError::EmptySegment.into();
        assert!(matches!(err, AuthzError::InvalidScope(_)));
    }

    #[test]
    fn invalid_policy_display() {
        let err = AuthzError::InvalidPolicy {
            policy: "resource.doc.default".to_string(),
            reason: "empty resource kind".to_string(),
        };
        assert!(err.to_string().contains("resource.doc.default"));
    }
}
