//! Audit record construction
//!
//! The engine returns one record per check for an external sink to persist;
//! the core neither writes nor transports it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::decision::{ActionDecision, CheckResult};
use crate::derived_roles::RoleTrace;
use crate::types::CheckRequest;

/// Flattened per-check record for audit sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Request identifier, shared with the check result
    pub request_id: String,

    /// Principal that was checked
    pub principal_id: String,

    /// Resource kind and id
    pub resource_kind: String,
    pub resource_id: String,

    /// Requested actions in request order
    pub actions: Vec<String>,

    /// Per-action decisions including matched policy and rule
    pub decisions: IndexMap<String, ActionDecision>,

    /// Derived-role resolution trace
    pub derived_roles_trace: Vec<RoleTrace>,

    /// Scope the request was resolved against
    pub scope: String,

    /// Evaluation time in microseconds
    pub duration_micros: u64,

    /// When the record was built
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Builds an audit record from a request and its result.
    pub fn from_check(request: &CheckRequest, result: &CheckResult) -> Self {
        Self {
            request_id: result.request_id.clone(),
            principal_id: request.principal.id.clone(),
            resource_kind: request.resource.kind.clone(),
            resource_id: request.resource.id.clone(),
            actions: request.actions.clone(),
            decisions: result.decisions.clone(),
            derived_roles_trace: result.derived_roles_trace.clone(),
            scope: result.scope.clone(),
            duration_micros: result.duration_micros,
            timestamp: Utc::now(),
        }
    }
}
