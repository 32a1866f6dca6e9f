//! Policy data model: rules, resource policies, principal policies

mod store;

pub use store::{PolicyStore, StoreStats};
pub(crate) use store::PolicyIndex;

use crate::pattern;
use serde::{Deserialize, Serialize};

/// Effect of a matched rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

/// A rule inside a resource policy.
///
/// A rule matches an action when its action patterns match, its role set
/// intersects the principal's direct and derived roles, and its condition
/// (if any) evaluates true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule name, reported in decision metadata
    pub name: String,

    /// Action patterns (`view`, `admin:*`, `*`)
    #[serde(default)]
    pub actions: Vec<String>,

    /// Effect when the rule matches
    pub effect: Effect,

    /// Roles this rule applies to; may reference derived roles
    #[serde(default)]
    pub roles: Vec<String>,

    /// Optional condition expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Rule {
    /// Creates a rule with no actions, roles or condition.
    pub fn new(name: impl Into<String>, effect: Effect) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            effect,
            roles: Vec::new(),
            condition: None,
        }
    }

    /// Sets the action patterns.
    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the role set.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches a condition expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Whether any action pattern matches the action.
    pub fn matches_action(&self, action: &str) -> bool {
        pattern::matches_any(action, &self.actions)
    }

    /// Whether the rule's role set intersects the held roles. An empty role
    /// set never matches (fail closed).
    pub fn matches_roles(&self, held: &[String]) -> bool {
        self.roles
            .iter()
            .any(|role_pattern| held.iter().any(|role| pattern::matches(role, role_pattern)))
    }
}

/// Policy attached to a resource kind at a scope.
///
/// The empty scope is the global fallback. Rules are evaluated in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePolicy {
    /// Resource kind this policy governs
    pub resource_kind: String,

    /// Scope; empty means global
    #[serde(default)]
    pub scope: String,

    /// Policy version, part of the audit label
    pub version: String,

    /// Ordered rules
    pub rules: Vec<Rule>,
}

impl ResourcePolicy {
    /// Creates an empty policy at the global scope.
    pub fn new(resource_kind: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            scope: String::new(),
            version: version.into(),
            rules: Vec::new(),
        }
    }

    /// Sets the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Audit label, e.g. `resource.document.default/acme.eng`.
    pub fn label(&self) -> String {
        if self.scope.is_empty() {
            format!("resource.{}.{}", self.resource_kind, self.version)
        } else {
            format!("resource.{}.{}/{}", self.resource_kind, self.version, self.scope)
        }
    }
}

/// A rule inside a principal policy.
///
/// Selects a resource kind by pattern instead of a role set; the principal
/// is already selected by the enclosing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRule {
    /// Resource kind pattern this rule applies to
    pub resource: String,

    /// Rule name, reported in decision metadata
    pub name: String,

    /// Action patterns
    #[serde(default)]
    pub actions: Vec<String>,

    /// Effect when the rule matches
    pub effect: Effect,

    /// Optional condition expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl PrincipalRule {
    /// Creates a rule for a resource kind pattern.
    pub fn new(
        resource: impl Into<String>,
        name: impl Into<String>,
        effect: Effect,
    ) -> Self {
        Self {
            resource: resource.into(),
            name: name.into(),
            actions: Vec::new(),
            effect,
            condition: None,
        }
    }

    /// Sets the action patterns.
    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches a condition expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Whether this rule applies to the resource kind.
    pub fn matches_resource(&self, kind: &str) -> bool {
        pattern::matches(kind, &self.resource)
    }

    /// Whether any action pattern matches the action.
    pub fn matches_action(&self, action: &str) -> bool {
        pattern::matches_any(action, &self.actions)
    }
}

/// Policy attached to a principal ID (exact or pattern) at a scope.
///
/// A matching principal policy always overrides resource policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPolicy {
    /// Principal ID, exact (`user:alice`) or pattern (`user:*`)
    pub principal_id: String,

    /// Scope; empty means global
    #[serde(default)]
    pub scope: String,

    /// Policy version, part of the audit label
    pub version: String,

    /// Ordered rules
    pub rules: Vec<PrincipalRule>,
}

impl PrincipalPolicy {
    /// Creates an empty policy at the global scope.
    pub fn new(principal_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            scope: String::new(),
            version: version.into(),
            rules: Vec::new(),
        }
    }

    /// Sets the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: PrincipalRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Audit label, e.g. `principal.user:alice.default`.
    pub fn label(&self) -> String {
        if self.scope.is_empty() {
            format!("principal.{}.{}", self.principal_id, self.version)
        } else {
            format!("principal.{}.{}/{}", self.principal_id, self.version, self.scope)
        }
    }
}
