//! Scope chain building and pattern matching with an LRU+TTL cache

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

use super::types::{Scope, ScopeError};

/// Configuration for the scope resolver
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    /// Maximum depth of the scope hierarchy
    pub max_depth: usize,

    /// Time-to-live for cached chains
    pub cache_ttl: Duration,

    /// Maximum number of cached chains (LRU eviction beyond this)
    pub cache_capacity: usize,

    /// Character set allowed in scope segments
    pub allowed_segment: Regex,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 10_000,
            allowed_segment: Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap(),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub size: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

struct ChainEntry {
    chain: Vec<String>,
    expires_at: Instant,
}

/// Builds hierarchical scope chains and matches scopes against patterns.
///
/// Chains run from most specific to the global scope and always end in `""`:
/// `"a.b.c"` becomes `["a.b.c", "a.b", "a", ""]`. Results are cached by the
/// input string in a mutex-guarded LRU with per-entry TTL; the cache is safe
/// for concurrent use and its critical section covers only the lookup or
/// insert itself.
///
/// # Examples
///
/// ```
/// use decisis::scope::{ScopeConfig, ScopeResolver};
///
/// let resolver = ScopeResolver::new(ScopeConfig::default());
///
/// let chain = resolver.build_chain("org.acme.dept").unwrap();
/// assert_eq!(chain, vec!["org.acme.dept", "org.acme", "org", ""]);
///
/// assert!(resolver.match_scope("org.*", "org.acme"));
/// assert!(resolver.match_scope("org.**", "org.acme.dept"));
/// assert!(!resolver.match_scope("org.*", "org.acme.dept"));
/// ```
pub struct ScopeResolver {
    config: ScopeConfig,
    chain_cache: Mutex<LruCache<String, ChainEntry>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl ScopeResolver {
    /// Creates a resolver with the given configuration.
    pub fn new(config: ScopeConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .unwrap_or_else(|| NonZeroUsize::new(1).unwrap());

        Self {
            config,
            chain_cache: Mutex::new(LruCache::new(capacity)),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Builds the inheritance chain for a scope, most specific first, ending
    /// with the global scope `""`.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError` when the scope has empty segments, segments with
    /// disallowed characters, or exceeds the configured maximum depth.
    pub fn build_chain(&self, scope: &str) -> Result<Vec<String>, ScopeError> {
        if scope.is_empty() {
            return Ok(vec![String::new()]);
        }

        let now = Instant::now();
        {
            let mut cache = self.chain_cache.lock();
            let expired = match cache.get(scope) {
                Some(entry) if entry.expires_at > now => {
                    self.hit_count.fetch_add(1, Ordering::Relaxed);
                    return Ok(entry.chain.clone());
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                cache.pop(scope);
            }
        }
        self.miss_count.fetch_add(1, Ordering::Relaxed);

        self.validate(scope)?;
        let parsed = Scope::new(scope)?;
        let segments = parsed.segments();

        let mut chain = Vec::with_capacity(segments.len() + 1);
        for i in (1..=segments.len()).rev() {
            chain.push(segments[..i].join("."));
        }
        chain.push(String::new());

        let mut cache = self.chain_cache.lock();
        cache.put(
            scope.to_string(),
            ChainEntry {
                chain: chain.clone(),
                expires_at: now + self.config.cache_ttl,
            },
        );

        Ok(chain)
    }

    /// Matches a scope against a wildcard pattern.
    ///
    /// Supported patterns:
    /// - exact match
    /// - `*` alone matches any scope
    /// - `*` as a segment matches exactly one non-empty segment
    /// - a trailing `**` matches zero or more remaining segments, so `a.**`
    ///   matches `a`, `a.b` and `a.b.c`
    ///
    /// A `**` anywhere but the end makes the pattern invalid; invalid
    /// patterns never match.
    pub fn match_scope(&self, pattern: &str, scope: &str) -> bool {
        if pattern == scope {
            return true;
        }

        if pattern == "*" || pattern == "**" {
            return true;
        }

        let pattern_segments: Vec<&str> = pattern.split('.').collect();
        if pattern_segments[..pattern_segments.len() - 1]
            .iter()
            .any(|s| *s == "**")
        {
            warn!(%pattern, "invalid scope pattern: '**' is only allowed in trailing position");
            return false;
        }

        let scope_segments: Vec<&str> = if scope.is_empty() {
            Vec::new()
        } else {
            scope.split('.').collect()
        };

        if pattern_segments.last() == Some(&"**") {
            let head = &pattern_segments[..pattern_segments.len() - 1];
            if head.len() > scope_segments.len() {
                return false;
            }
            return head
                .iter()
                .zip(scope_segments.iter())
                .all(|(p, s)| *p == "*" || p == s);
        }

        if pattern_segments.len() != scope_segments.len() {
            return false;
        }

        pattern_segments
            .iter()
            .zip(scope_segments.iter())
            .all(|(p, s)| *p == "*" || p == s)
    }

    /// Validates a scope string against depth and character-set limits.
    pub fn validate(&self, scope: &str) -> Result<(), ScopeError> {
        if scope.is_empty() {
            return Ok(());
        }

        let parsed = Scope::new(scope)?;
        let segments = parsed.segments();

        if segments.len() > self.config.max_depth {
            return Err(ScopeError::DepthExceeded {
                depth: segments.len(),
                max_depth: self.config.max_depth,
            });
        }

        for segment in segments {
            Scope::validate_segment(segment, &self.config.allowed_segment)?;
        }

        Ok(())
    }

    /// Clears the chain cache and resets statistics.
    pub fn clear_cache(&self) {
        self.chain_cache.lock().clear();
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.chain_cache.lock().len(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Returns the configured maximum scope depth.
    pub fn max_depth(&self) -> usize {
        self.config.max_depth
    }
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::new(ScopeConfig::default())
    }
}
