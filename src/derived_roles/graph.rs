//! Dependency graph over derived roles
//!
//! An edge exists from definition X to definition Y when X's parent-role set
//! names Y. Kahn's algorithm produces the evaluation order; when it cannot,
//! a DFS reconstructs the offending cycle for the error message.

use super::types::DerivedRoleDef;
use crate::error::AuthzError;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Visit {
    White,
    Gray,
    Black,
}

/// Dependency graph between derived role definitions.
#[derive(Debug, Clone)]
pub struct RoleGraph {
    /// Node names in definition order (keeps the sort deterministic)
    nodes: Vec<String>,

    /// Dependencies: `deps[x]` must be evaluated before `x`
    deps: HashMap<String, Vec<String>>,
}

impl RoleGraph {
    /// Builds the graph from a definition set. Only exact parent-role names
    /// that refer to another definition become edges; wildcard patterns
    /// select principal roles at runtime, not definitions.
    pub fn from_definitions(defs: &[DerivedRoleDef]) -> Self {
        let names: HashSet<&str> = defs.iter().map(|d| d.name.as_str()).collect();

        let mut nodes = Vec::with_capacity(defs.len());
        let mut deps: HashMap<String, Vec<String>> = HashMap::with_capacity(defs.len());

        for def in defs {
            nodes.push(def.name.clone());
            let entry = deps.entry(def.name.clone()).or_default();
            for parent in &def.parent_roles {
                if names.contains(parent.as_str()) && !entry.contains(parent) {
                    entry.push(parent.clone());
                }
            }
        }

        Self { nodes, deps }
    }

    /// Resolves the evaluation order with Kahn's algorithm.
    ///
    /// Dependencies come before dependents; among unrelated definitions the
    /// declaration order is preserved, so the result is deterministic for a
    /// given input.
    ///
    /// # Errors
    ///
    /// `AuthzError::CircularDependency` naming the cycle when one exists.
    pub fn topological_sort(&self) -> Result<Vec<String>, AuthzError> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.as_str(), 0)).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for node in &self.nodes {
            if let Some(deps) = self.deps.get(node.as_str()) {
                for dep in deps {
                    if let Some(degree) = in_degree.get_mut(node.as_str()) {
                        *degree += 1;
                    }
                    dependents.entry(dep.as_str()).or_default().push(node.as_str());
                }
            }
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|name| in_degree[name] == 0)
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(current) = queue.pop_front() {
            sorted.push(current.to_string());

            if let Some(children) = dependents.get(current) {
                for &child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(child);
                        }
                    }
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            let cycle = self.find_cycle().unwrap_or_default();
            return Err(AuthzError::CircularDependency { cycle });
        }

        Ok(sorted)
    }

    /// DFS with gray/black marking; returns the first cycle path found,
    /// closed on the repeated node (e.g. `["a", "b", "a"]`).
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut state: HashMap<&str, Visit> =
            self.nodes.iter().map(|n| (n.as_str(), Visit::White)).collect();
        let mut path: Vec<&str> = Vec::new();

        for start in &self.nodes {
            if state[start.as_str()] == Visit::White {
                if let Some(cycle) = self.visit(start.as_str(), &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        state: &mut HashMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match state.get(node) {
            Some(Visit::Gray) => {
                let start = path.iter().position(|n| *n == node)?;
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            Some(Visit::Black) => return None,
            _ => {}
        }

        state.insert(node, Visit::Gray);
        path.push(node);

        if let Some(deps) = self.deps.get(node) {
            for dep in deps {
                if let Some(cycle) = self.visit(dep.as_str(), state, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        state.insert(node, Visit::Black);
        None
    }
}
