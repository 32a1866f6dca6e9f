//! Scope value type and validation

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing or validating a scope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("scope contains empty segment")]
    EmptySegment,

    #[error("scope depth {depth} exceeds maximum {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },

    #[error("invalid scope segment '{segment}' (allowed: alphanumeric, underscore, hyphen)")]
    InvalidSegment { segment: String },
}

/// A hierarchical authorization scope.
///
/// Scopes use dot notation (`org.acme.dept`); the empty string is the global
/// scope. Parsing rejects empty segments; character-set and depth limits are
/// enforced by the resolver, which owns that configuration.
///
/// # Examples
///
/// ```
/// use decisis::scope::Scope;
///
/// let scope = Scope::new("org.acme.dept").unwrap();
/// assert_eq!(scope.depth(), 3);
/// assert_eq!(scope.parent().unwrap().as_str(), "org.acme");
///
/// let global = Scope::new("").unwrap();
/// assert!(global.is_global());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    raw: String,
    segments: Vec<String>,
}

impl Scope {
    /// Parses a scope string.
    pub fn new(scope: impl Into<String>) -> Result<Self, ScopeError> {
        let raw = scope.into();

        if raw.is_empty() {
            return Ok(Self {
                raw,
                segments: Vec::new(),
            });
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        for segment in &segments {
            if segment.is_empty() {
                return Err(ScopeError::EmptySegment);
            }
        }

        Ok(Self { raw, segments })
    }

    /// Returns the raw scope string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the scope segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the global (empty) scope.
    pub fn is_global(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the scope one level up; the global scope has no parent.
    pub fn parent(&self) -> Option<Scope> {
        if self.segments.is_empty() {
            return None;
        }

        let parent_segments = &self.segments[..self.segments.len() - 1];
        Some(Self {
            raw: parent_segments.join("."),
            segments: parent_segments.to_vec(),
        })
    }

    /// Whether this scope is a segment-wise prefix of another scope.
    pub fn is_prefix_of(&self, other: &Scope) -> bool {
        if self.segments.len() > other.segments.len() {
            return false;
        }

        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a == b)
    }

    pub(crate) fn validate_segment(segment: &str, allowed: &Regex) -> Result<(), ScopeError> {
        if segment.is_empty() {
            return Err(ScopeError::EmptySegment);
        }

        if !allowed.is_match(segment) {
            return Err(ScopeError::InvalidSegment {
                segment: segment.to_string(),
            });
        }

        Ok(())
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl AsRef<str> for Scope {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segments() {
        let scope = Scope::new("org.acme.dept").unwrap();
        assert_eq!(scope.segments(), &["org", "acme", "dept"]);
        assert_eq!(scope.depth(), 3);
    }

    #[test]
    fn empty_scope_is_global() {
        let scope = Scope::new("").unwrap();
        assert!(scope.is_global());
        assert_eq!(scope.depth(), 0);
        assert!(scope.parent().is_none());
    }

    #[test]
    fn rejects_empty_segment() {
        assert!(matches!(Scope::new("org..dept"), Err(ScopeError::EmptySegment)));
        assert!(matches!(Scope::new(".org"), Err(ScopeError::EmptySegment)));
        assert!(matches!(Scope::new("org."), Err(ScopeError::EmptySegment)));
    }

    #[test]
    fn parent_walks_to_global() {
        let scope = Scope::new("org.acme.dept").unwrap();
        let parent = scope.parent().unwrap();
        assert_eq!(parent.as_str(), "org.acme");

        let grandparent = parent.parent().unwrap();
        assert_eq!(grandparent.as_str(), "org");

        let root = grandparent.parent().unwrap();
        assert!(root.is_global());
        assert!(root.parent().is_none());
    }

    #[test]
    fn prefix_relationships() {
        let parent = Scope::new("org.acme").unwrap();
        let child = Scope::new("org.acme.dept").unwrap();
        let other = Scope::new("org.beta").unwrap();

        assert!(parent.is_prefix_of(&child));
        assert!(parent.is_prefix_of(&parent));
        assert!(!child.is_prefix_of(&parent));
        assert!(!parent.is_prefix_of(&other));
    }

    #[test]
    fn display_round_trip() {
        let scope: Scope = "org.acme".parse().unwrap();
        assert_eq!(format!("{}", scope), "org.acme");
    }
}
