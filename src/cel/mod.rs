//! Condition evaluation adapter
//!
//! The decision engine is agnostic to the concrete expression language; it
//! talks to a [`ConditionEvaluator`] that answers boolean questions over a
//! structured request context. The default implementation wraps
//! `cel-interpreter` and caches compiled programs.

mod context;
mod convert;
mod engine;
mod error;

pub use context::EvalContext;
pub use convert::{cel_to_json, json_to_cel};
pub use engine::{CelEvaluator, ConditionEvaluator};
pub use error::CelError;
