//! Evaluation context handed to condition expressions

use crate::types::{Principal, Resource};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Variables available during condition evaluation.
///
/// Expressions see `principal`, `resource`, `action` and `auxData`, along
/// with the shorthand aliases `P`, `R` and `A`, and the computed
/// `derivedRoles` list. Entity attributes are exposed both flattened onto
/// the entity map and nested under `attr`, so `R.attr.ownerId` and
/// `resource.ownerId` are equivalent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalContext {
    /// Principal fields and attributes
    pub principal: HashMap<String, Value>,

    /// Resource fields and attributes
    pub resource: HashMap<String, Value>,

    /// Action under evaluation
    pub action: String,

    /// Auxiliary request data
    pub aux_data: HashMap<String, Value>,

    /// Derived roles activated for this principal/resource pair
    pub derived_roles: Vec<String>,
}

impl EvalContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a principal and resource.
    pub fn from_entities(principal: &Principal, resource: &Resource) -> Self {
        let mut principal_map = HashMap::with_capacity(principal.attributes.len() + 4);
        for (key, value) in &principal.attributes {
            principal_map.insert(key.clone(), value.clone());
        }
        principal_map.insert(
            "attr".to_string(),
            Value::Object(principal.attributes.clone().into_iter().collect()),
        );
        principal_map.insert("id".to_string(), Value::String(principal.id.clone()));
        principal_map.insert("roles".to_string(), json!(principal.roles));
        principal_map.insert("scope".to_string(), Value::String(principal.scope.clone()));

        let mut resource_map = HashMap::with_capacity(resource.attributes.len() + 4);
        for (key, value) in &resource.attributes {
            resource_map.insert(key.clone(), value.clone());
        }
        resource_map.insert(
            "attr".to_string(),
            Value::Object(resource.attributes.clone().into_iter().collect()),
        );
        resource_map.insert("kind".to_string(), Value::String(resource.kind.clone()));
        resource_map.insert("id".to_string(), Value::String(resource.id.clone()));
        resource_map.insert("scope".to_string(), Value::String(resource.scope.clone()));

        Self {
            principal: principal_map,
            resource: resource_map,
            action: String::new(),
            aux_data: HashMap::new(),
            derived_roles: Vec::new(),
        }
    }

    /// Sets the action under evaluation.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Sets the auxiliary request data.
    pub fn with_aux_data(mut self, aux_data: HashMap<String, Value>) -> Self {
        self.aux_data = aux_data;
        self
    }

    /// Sets the derived-roles list.
    pub fn with_derived_roles(mut self, derived_roles: Vec<String>) -> Self {
        self.derived_roles = derived_roles;
        self
    }

    /// Flattens the context into named variables for the evaluator,
    /// including the `P`/`R`/`A` aliases.
    pub fn to_variables(&self) -> HashMap<String, Value> {
        let mut vars = HashMap::with_capacity(8);

        let principal = Value::Object(self.principal.clone().into_iter().collect());
        vars.insert("principal".to_string(), principal.clone());
        vars.insert("P".to_string(), principal);

        let resource = Value::Object(self.resource.clone().into_iter().collect());
        vars.insert("resource".to_string(), resource.clone());
        vars.insert("R".to_string(), resource);

        vars.insert("action".to_string(), Value::String(self.action.clone()));
        vars.insert("A".to_string(), Value::String(self.action.clone()));

        vars.insert(
            "auxData".to_string(),
            Value::Object(self.aux_data.clone().into_iter().collect()),
        );
        vars.insert("derivedRoles".to_string(), json!(self.derived_roles));

        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_entities_exposes_fixed_fields() {
        let principal = Principal::new("user:alice")
            .with_role("viewer")
            .with_scope("acme");
        let resource = Resource::new("document", "d1").with_attribute("ownerId", "user:alice");

        let ctx = EvalContext::from_entities(&principal, &resource);

        assert_eq!(ctx.principal.get("id"), Some(&json!("user:alice")));
        assert_eq!(ctx.principal.get("roles"), Some(&json!(["viewer"])));
        assert_eq!(ctx.resource.get("kind"), Some(&json!("document")));
        // flattened and nested attribute access
        assert_eq!(ctx.resource.get("ownerId"), Some(&json!("user:alice")));
        assert_eq!(
            ctx.resource.get("attr").and_then(|a| a.get("ownerId")),
            Some(&json!("user:alice"))
        );
    }

    #[test]
    fn fixed_fields_win_over_attribute_collisions() {
        let principal = Principal::new("user:alice").with_attribute("id", "spoofed");
        let resource = Resource::new("document", "d1");

        let ctx = EvalContext::from_entities(&principal, &resource);
        assert_eq!(ctx.principal.get("id"), Some(&json!("user:alice")));
    }

    #[test]
    fn variables_include_aliases() {
        let ctx = EvalContext::from_entities(
            &Principal::new("user:alice"),
            &Resource::new("document", "d1"),
        )
        .with_action("view")
        .with_derived_roles(vec!["owner".to_string()]);

        let vars = ctx.to_variables();
        assert_eq!(vars.get("principal"), vars.get("P"));
        assert_eq!(vars.get("resource"), vars.get("R"));
        assert_eq!(vars.get("A"), Some(&json!("view")));
        assert_eq!(vars.get("derivedRoles"), Some(&json!(["owner"])));
    }
}
