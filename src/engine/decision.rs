//! Decision types returned by the engine

use crate::derived_roles::RoleTrace;
use crate::policy::Effect;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome for a single action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDecision {
    /// Allow or deny
    pub effect: Effect,

    /// Label of the policy that decided, absent on default deny
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    /// Name of the rule that decided, absent on default deny
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,

    /// Derived roles active while this action was evaluated
    #[serde(default)]
    pub derived_roles: Vec<String>,

    /// Evaluation failure absorbed into this decision, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionDecision {
    pub(crate) fn matched(
        effect: Effect,
        policy: String,
        rule: String,
        derived_roles: Vec<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            effect,
            policy: Some(policy),
            rule: Some(rule),
            derived_roles,
            error,
        }
    }

    /// Default deny: nothing matched at any scope level.
    pub(crate) fn no_match(derived_roles: Vec<String>, error: Option<String>) -> Self {
        Self {
            effect: Effect::Deny,
            policy: None,
            rule: None,
            derived_roles,
            error,
        }
    }

    /// Whether the action was allowed.
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }
}

/// Result of one `check` call: one decision per requested action plus
/// request-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Unique request identifier
    pub request_id: String,

    /// The scope the request was resolved against
    pub scope: String,

    /// Per-action decisions, in request order
    pub decisions: IndexMap<String, ActionDecision>,

    /// Derived-role resolution trace for audit
    pub derived_roles_trace: Vec<RoleTrace>,

    /// Wall-clock evaluation time in microseconds
    pub duration_micros: u64,
}

impl CheckResult {
    /// Whether the given action was allowed; unknown actions are denied.
    pub fn allowed(&self, action: &str) -> bool {
        self.decisions
            .get(action)
            .map(ActionDecision::is_allowed)
            .unwrap_or(false)
    }

    /// The decision for an action, if it was part of the request.
    pub fn decision(&self, action: &str) -> Option<&ActionDecision> {
        self.decisions.get(action)
    }
}
