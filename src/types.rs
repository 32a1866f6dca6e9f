//! Core request types: principals, resources, check requests

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Principal requesting access (user, service account, agent).
///
/// Immutable for the duration of a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier (e.g. "user:alice", "svc:billing")
    pub id: String,

    /// Directly assigned roles
    #[serde(default)]
    pub roles: Vec<String>,

    /// Additional attributes available to conditions
    #[serde(default)]
    pub attributes: HashMap<String, Value>,

    /// Dotted hierarchical scope; empty means global
    #[serde(default)]
    pub scope: String,
}

impl Principal {
    /// Creates a principal with no roles, attributes or scope.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            attributes: HashMap::new(),
            scope: String::new(),
        }
    }

    /// Adds a single role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Adds several roles at once.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the principal's scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// Resource being accessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource kind (e.g. "document", "payment")
    pub kind: String,

    /// Resource identifier
    pub id: String,

    /// Additional attributes available to conditions
    #[serde(default)]
    pub attributes: HashMap<String, Value>,

    /// Dotted hierarchical scope; empty means global
    #[serde(default)]
    pub scope: String,
}

impl Resource {
    /// Creates a resource with no attributes or scope.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            attributes: HashMap::new(),
            scope: String::new(),
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the resource's scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// A batch authorization request: one principal, one resource, many actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Who is making the request
    pub principal: Principal,

    /// What is being accessed
    pub resource: Resource,

    /// Requested actions, each decided independently
    pub actions: Vec<String>,

    /// Auxiliary request data exposed to conditions as `auxData`
    #[serde(default)]
    pub aux_data: HashMap<String, Value>,
}

impl CheckRequest {
    /// Creates a check request for the given actions.
    pub fn new<I, S>(principal: Principal, resource: Resource, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principal,
            resource,
            actions: actions.into_iter().map(Into::into).collect(),
            aux_data: HashMap::new(),
        }
    }

    /// Attaches an auxiliary data entry.
    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.aux_data.insert(key.into(), value.into());
        self
    }
}
