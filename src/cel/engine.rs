//! CEL evaluator with compiled program caching

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context, Program};
use dashmap::DashMap;
use std::sync::Arc;

use super::context::EvalContext;
use super::convert::json_to_cel;
use super::error::{CelError, Result};

/// Boolean condition evaluation over a structured request context.
///
/// This is the seam between the decision engine and whatever expression
/// language backs it: the engine only ever asks for a boolean. Evaluation
/// failures of any kind (parse error, type error, unknown reference) surface
/// as [`CelError`] and are treated fail-closed by the caller.
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluates an expression against the context.
    fn evaluate_bool(&self, expression: &str, ctx: &EvalContext) -> Result<bool>;
}

/// Default evaluator backed by `cel-interpreter`.
///
/// Compiled programs are cached by expression source so repeated evaluation
/// of the same condition skips parsing.
pub struct CelEvaluator {
    programs: DashMap<String, Arc<Program>>,
}

impl CelEvaluator {
    /// Creates an evaluator with an empty program cache.
    pub fn new() -> Self {
        Self {
            programs: DashMap::new(),
        }
    }

    /// Compiles an expression, reusing the cached program when available.
    pub fn compile(&self, expression: &str) -> Result<Arc<Program>> {
        if let Some(program) = self.programs.get(expression) {
            return Ok(program.clone());
        }

        let program = Program::compile(expression)
            .map_err(|e| CelError::Compilation(format!("{:?}", e)))?;

        let program = Arc::new(program);
        self.programs
            .insert(expression.to_string(), program.clone());

        Ok(program)
    }

    /// Evaluates a compiled program against the context.
    pub fn evaluate(&self, program: &Program, ctx: &EvalContext) -> Result<bool> {
        let mut cel_context = Context::default();
        for (name, value) in ctx.to_variables() {
            let _ = cel_context.add_variable(name, json_to_cel(&value));
        }

        let result = program
            .execute(&cel_context)
            .map_err(|e| CelError::Evaluation(format!("{:?}", e)))?;

        match result {
            CelValue::Bool(b) => Ok(b),
            _ => Err(CelError::NonBooleanResult),
        }
    }

    /// Clears the compiled program cache.
    pub fn clear_cache(&self) {
        self.programs.clear();
    }

    /// Number of cached programs.
    pub fn cached_programs(&self) -> usize {
        self.programs.len()
    }
}

impl ConditionEvaluator for CelEvaluator {
    fn evaluate_bool(&self, expression: &str, ctx: &EvalContext) -> Result<bool> {
        let program = self.compile(expression)?;
        self.evaluate(&program, ctx)
    }
}

impl Default for CelEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

// DashMap makes the program cache safe to share across threads.
unsafe impl Send for CelEvaluator {}
unsafe impl Sync for CelEvaluator {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Principal, Resource};

    fn test_context() -> EvalContext {
        EvalContext::from_entities(
            &Principal::new("user:alice")
                .with_role("admin")
                .with_role("editor")
                .with_attribute("level", 5),
            &Resource::new("document", "d1").with_attribute("ownerId", "user:alice"),
        )
        .with_action("view")
    }

    #[test]
    fn literal_booleans() {
        let evaluator = CelEvaluator::new();
        let ctx = test_context();

        assert!(evaluator.evaluate_bool("true", &ctx).unwrap());
        assert!(!evaluator.evaluate_bool("false", &ctx).unwrap());
    }

    #[test]
    fn variable_access_with_aliases() {
        let evaluator = CelEvaluator::new();
        let ctx = test_context();

        assert!(evaluator
            .evaluate_bool("principal.id == 'user:alice'", &ctx)
            .unwrap());
        assert!(evaluator.evaluate_bool("P.id == 'user:alice'", &ctx).unwrap());
        assert!(evaluator.evaluate_bool("A == 'view'", &ctx).unwrap());
    }

    #[test]
    fn membership_test_on_roles() {
        let evaluator = CelEvaluator::new();
        let ctx = test_context();

        assert!(evaluator
            .evaluate_bool("'admin' in principal.roles", &ctx)
            .unwrap());
        assert!(!evaluator
            .evaluate_bool("'viewer' in principal.roles", &ctx)
            .unwrap());
    }

    #[test]
    fn ownership_comparison() {
        let evaluator = CelEvaluator::new();
        let ctx = test_context();

        assert!(evaluator
            .evaluate_bool("R.attr.ownerId == P.id", &ctx)
            .unwrap());
        assert!(evaluator
            .evaluate_bool("resource.ownerId == principal.id", &ctx)
            .unwrap());
    }

    #[test]
    fn numeric_attribute_comparison() {
        let evaluator = CelEvaluator::new();
        let ctx = test_context();

        assert!(evaluator.evaluate_bool("P.attr.level >= 3", &ctx).unwrap());
        assert!(!evaluator.evaluate_bool("P.attr.level > 9", &ctx).unwrap());
    }

    #[test]
    fn programs_are_cached() {
        let evaluator = CelEvaluator::new();
        let ctx = test_context();

        evaluator.evaluate_bool("true", &ctx).unwrap();
        evaluator.evaluate_bool("true", &ctx).unwrap();
        assert_eq!(evaluator.cached_programs(), 1);

        evaluator.evaluate_bool("false", &ctx).unwrap();
        assert_eq!(evaluator.cached_programs(), 2);

        evaluator.clear_cache();
        assert_eq!(evaluator.cached_programs(), 0);
    }

    #[test]
    fn compile_error_reported() {
        let evaluator = CelEvaluator::new();
        let result = evaluator.compile("not a valid @# expression");
        assert!(matches!(result, Err(CelError::Compilation(_))));
    }

    #[test]
    fn non_boolean_result_rejected() {
        let evaluator = CelEvaluator::new();
        let ctx = test_context();

        let result = evaluator.evaluate_bool("'hello'", &ctx);
        assert!(matches!(result, Err(CelError::NonBooleanResult)));
    }
}
