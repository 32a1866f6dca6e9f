//! Wildcard pattern matching for `:`-segmented identifiers
//!
//! Actions, rule roles, parent-role patterns and principal IDs all share the
//! same pattern grammar:
//!
//! 1. Exact match: `"delete"` matches `"delete"`
//! 2. Universal wildcard: `"*"` matches anything
//! 3. Prefix wildcard: `"admin:*"` matches `"admin:read"`, `"admin:write"`
//! 4. Suffix wildcard: `"*:viewer"` matches `"doc:viewer"`, `"proj:viewer"`
//!
//! Patterns with `*` in other positions (e.g. `"user:*:admin"`) fall back to
//! an anchored regex translation.

use regex::Regex;

/// Checks whether a value matches a wildcard pattern.
///
/// # Examples
///
/// ```
/// use decisis::pattern::matches;
///
/// assert!(matches("delete", "delete"));
/// assert!(matches("anything:at:all", "*"));
/// assert!(matches("admin:read", "admin:*"));
/// assert!(matches("doc:viewer", "*:viewer"));
/// assert!(!matches("user:read", "admin:*"));
/// ```
pub fn matches(value: &str, pattern: &str) -> bool {
    if pattern == value {
        return true;
    }

    if pattern == "*" {
        return true;
    }

    // Prefix wildcard: "prefix:*"
    if let Some(prefix) = pattern.strip_suffix(":*") {
        if !prefix.contains('*') {
            return value.starts_with(&format!("{}:", prefix));
        }
    }

    // Suffix wildcard: "*:suffix"
    if let Some(suffix) = pattern.strip_prefix("*:") {
        if !suffix.contains('*') {
            return value.ends_with(&format!(":{}", suffix));
        }
    }

    // General case: translate remaining wildcards to an anchored regex
    if pattern.contains('*') {
        let translated = regex::escape(pattern).replace(r"\*", ".*");
        if let Ok(regex) = Regex::new(&format!("^{}$", translated)) {
            return regex.is_match(value);
        }
    }

    false
}

/// Checks whether any pattern in a set matches the value.
pub fn matches_any<S: AsRef<str>>(value: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| matches(value, p.as_ref()))
}
