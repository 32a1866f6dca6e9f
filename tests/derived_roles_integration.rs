//! Derived-roles integration tests: chained derivation, cycle rejection,
//! trace content and interaction with the decision engine.

use decisis::cel::CelEvaluator;
use decisis::derived_roles::{DerivedRoleDef, DerivedRolesResolver, RoleOutcome};
use decisis::{
    AuthzError, CheckRequest, DecisionEngine, Effect, EngineConfig, PolicyBundle, Principal,
    Resource, ResourcePolicy, Rule,
};

#[test]
fn chained_derivation_is_order_independent() {
    // Two definition orders, same outcome.
    let forward = vec![
        DerivedRoleDef::new("manager", ["employee"]),
        DerivedRoleDef::new("senior_manager", ["manager"]),
        DerivedRoleDef::new("director", ["senior_manager"]),
    ];
    let mut backward = forward.clone();
    backward.reverse();

    let principal = Principal::new("user:1").with_role("employee");
    let resource = Resource::new("doc", "d1");
    let evaluator = CelEvaluator::new();

    for defs in [forward, backward] {
        let resolver = DerivedRolesResolver::new();
        resolver.load_definitions(defs).unwrap();
        let resolved = resolver.resolve(&principal, &resource, &evaluator);
        assert_eq!(
            resolved.activated,
            vec!["manager", "senior_manager", "director"]
        );
    }
}

#[test]
fn conditional_chain_stops_where_the_condition_fails() {
    let resolver = DerivedRolesResolver::new();
    resolver
        .load_definitions(vec![
            DerivedRoleDef::new("manager", ["employee"]),
            DerivedRoleDef::new("senior_manager", ["manager"])
                .with_condition("P.attr.level >= 8"),
        ])
        .unwrap();
    let evaluator = CelEvaluator::new();
    let resource = Resource::new("doc", "d1");

    let junior = Principal::new("user:1").with_role("employee").with_attribute("level", 3);
    let resolved = resolver.resolve(&junior, &resource, &evaluator);
    assert_eq!(resolved.activated, vec!["manager"]);

    let trace: Vec<_> = resolved
        .trace
        .iter()
        .map(|t| (t.role.as_str(), t.outcome.clone()))
        .collect();
    assert!(trace.contains(&("manager", RoleOutcome::Activated)));
    assert!(trace.contains(&("senior_manager", RoleOutcome::ConditionFalse)));

    let senior = Principal::new("user:2").with_role("employee").with_attribute("level", 9);
    let resolved = resolver.resolve(&senior, &resource, &evaluator);
    assert_eq!(resolved.activated, vec!["manager", "senior_manager"]);
}

#[test]
fn cycle_is_rejected_at_load_never_at_request_time() {
    let resolver = DerivedRolesResolver::new();

    let result = resolver.load_definitions(vec![
        DerivedRoleDef::new("x", ["y"]),
        DerivedRoleDef::new("y", ["x"]),
    ]);

    match result {
        Err(AuthzError::CircularDependency { cycle }) => {
            assert!(cycle.contains(&"x".to_string()));
            assert!(cycle.contains(&"y".to_string()));
        }
        other => panic!("expected CircularDependency, got {:?}", other),
    }

    // the resolver still answers (with nothing loaded)
    let resolved = resolver.resolve(
        &Principal::new("user:1").with_role("x"),
        &Resource::new("doc", "d1"),
        &CelEvaluator::new(),
    );
    assert!(resolved.activated.is_empty());
}

#[test]
fn wildcard_parent_patterns_select_held_roles() {
    let resolver = DerivedRolesResolver::new();
    resolver
        .load_definitions(vec![
            DerivedRoleDef::new("admin_user", ["admin:*"]),
            DerivedRoleDef::new("any_viewer", ["*:viewer"]),
        ])
        .unwrap();
    let evaluator = CelEvaluator::new();
    let resource = Resource::new("doc", "d1");

    let admin = Principal::new("user:1").with_role("admin:read");
    assert_eq!(
        resolver.resolve(&admin, &resource, &evaluator).activated,
        vec!["admin_user"]
    );

    let viewer = Principal::new("user:2").with_role("doc:viewer");
    assert_eq!(
        resolver.resolve(&viewer, &resource, &evaluator).activated,
        vec!["any_viewer"]
    );
}

#[test]
fn engine_exposes_trace_in_check_result() {
    let bundle = PolicyBundle::default()
        .with_derived_role(
            DerivedRoleDef::new("owner", ["*"]).with_condition("R.attr.ownerId == P.id"),
        )
        .with_derived_role(DerivedRoleDef::new("auditor", ["compliance"]))
        .with_resource_policy(ResourcePolicy::new("doc", "default").with_rule(
            Rule::new("owner-delete", Effect::Allow)
                .with_actions(["delete"])
                .with_roles(["owner"]),
        ));
    let engine = DecisionEngine::new(EngineConfig::default());
    engine.load(bundle).unwrap();

    let request = CheckRequest::new(
        Principal::new("u1").with_role("member"),
        Resource::new("doc", "d1").with_attribute("ownerId", "u1"),
        ["delete"],
    );

    let result = engine.check(&request);
    assert!(result.allowed("delete"));

    let outcomes: Vec<_> = result
        .derived_roles_trace
        .iter()
        .map(|t| (t.role.as_str(), t.outcome.clone()))
        .collect();
    assert!(outcomes.contains(&("owner", RoleOutcome::Activated)));
    assert!(outcomes.contains(&("auditor", RoleOutcome::ParentsNotMatched)));
}

#[test]
fn derived_role_cache_is_scoped_to_principal_resource_pair() {
    let resolver = DerivedRolesResolver::new();
    resolver
        .load_definitions(vec![
            DerivedRoleDef::new("owner", ["*"]).with_condition("R.attr.ownerId == P.id"),
        ])
        .unwrap();
    let evaluator = CelEvaluator::new();

    let alice = Principal::new("alice").with_role("member");
    let bob = Principal::new("bob").with_role("member");
    let resource = Resource::new("doc", "d1").with_attribute("ownerId", "alice");

    assert_eq!(
        resolver.resolve(&alice, &resource, &evaluator).activated,
        vec!["owner"]
    );
    // a different principal id is a different cache key, not a stale hit
    assert!(resolver.resolve(&bob, &resource, &evaluator).activated.is_empty());
}
