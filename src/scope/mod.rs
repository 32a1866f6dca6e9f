//! Hierarchical scope resolution
//!
//! Scopes are dot-delimited namespaces (`acme.corp.eng`) used to partition
//! policies. The resolver builds inheritance chains from most specific to
//! global and matches scopes against wildcard patterns, with an LRU+TTL
//! cache in front of chain construction.

mod resolver;
mod types;

pub use resolver::{CacheStats, ScopeConfig, ScopeResolver};
pub use types::{Scope, ScopeError};
