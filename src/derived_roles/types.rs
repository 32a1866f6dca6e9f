//! Derived role definitions and resolution traces

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};

/// Declarative definition of a derived role.
///
/// A definition activates when any of its parent-role patterns matches a
/// role the principal holds (direct roles plus derived roles activated
/// earlier in the evaluation order) and its condition, if present, evaluates
/// true over the principal and resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRoleDef {
    /// Unique derived role name (e.g. "document_owner")
    pub name: String,

    /// Parent role patterns; supports `*`, `prefix:*`, `*:suffix`
    #[serde(rename = "parentRoles")]
    pub parent_roles: Vec<String>,

    /// Optional condition expression; absent or empty means always true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl DerivedRoleDef {
    /// Creates a definition without a condition.
    pub fn new<I, S>(name: impl Into<String>, parent_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parent_roles: parent_roles.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }

    /// Attaches a condition expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Validates the definition shape.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AuthzError::InvalidDefinition {
                role: "<unnamed>".to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }

        if self.parent_roles.is_empty() {
            return Err(AuthzError::InvalidDefinition {
                role: self.name.clone(),
                reason: "at least one parent role is required".to_string(),
            });
        }

        for parent in &self.parent_roles {
            if parent.is_empty() {
                return Err(AuthzError::InvalidDefinition {
                    role: self.name.clone(),
                    reason: "empty parent role pattern".to_string(),
                });
            }
            if parent == &self.name {
                return Err(AuthzError::InvalidDefinition {
                    role: self.name.clone(),
                    reason: "definition references itself as a parent role".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Why a definition did or did not activate during one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoleOutcome {
    /// Parents matched and the condition held
    Activated,
    /// No parent-role pattern matched a held role
    ParentsNotMatched,
    /// Condition evaluated to false
    ConditionFalse,
    /// Condition failed to evaluate; the role is not granted
    ConditionError { error: String },
}

/// Per-definition trace entry emitted by every resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTrace {
    /// The derived role name
    pub role: String,

    /// What happened to it
    pub outcome: RoleOutcome,
}
