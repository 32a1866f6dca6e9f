//! Whole-decision cache keyed by a BLAKE3 hash of the request

use blake3::Hasher;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::decision::CheckResult;
use crate::types::CheckRequest;

/// Decision cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached decisions
    pub capacity: usize,

    /// Time-to-live for cached decisions
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(60),
        }
    }
}

type CacheKey = [u8; 32];

struct CachedEntry {
    result: CheckResult,
    cached_at: Instant,
}

impl CachedEntry {
    fn new(result: CheckResult) -> Self {
        Self {
            result,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Caches complete check results across requests.
///
/// The key covers everything a decision depends on: principal identity,
/// roles, scope and attributes; resource kind, id, scope and attributes;
/// the action list and auxiliary data. Entries expire after the TTL and the
/// cache sheds roughly a tenth of its entries when full. Cleared wholesale
/// on policy reload.
pub struct DecisionCache {
    entries: DashMap<CacheKey, CachedEntry>,
    config: CacheConfig,
    stats: DashMap<&'static str, u64>,
}

impl DecisionCache {
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: DashMap::new(),
        }
    }

    /// Looks up a cached result for the request.
    pub fn get(&self, request: &CheckRequest) -> Option<CheckResult> {
        let key = Self::compute_key(request);

        if let Some(entry) = self.entries.get(&key) {
            if entry.is_expired(self.config.ttl) {
                drop(entry);
                self.entries.remove(&key);
                self.bump("expirations");
                return None;
            }

            self.bump("hits");
            return Some(entry.result.clone());
        }

        self.bump("misses");
        None
    }

    /// Stores a result for the request.
    pub fn put(&self, request: &CheckRequest, result: CheckResult) {
        if self.entries.len() >= self.config.capacity {
            self.evict_some();
        }

        let key = Self::compute_key(request);
        self.entries.insert(key, CachedEntry::new(result));
    }

    /// Clears the cache and its statistics.
    pub fn clear(&self) {
        self.entries.clear();
        self.stats.clear();
    }

    /// Cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stat("hits"),
            misses: self.stat("misses"),
            expirations: self.stat("expirations"),
            entries: self.entries.len(),
        }
    }

    fn compute_key(request: &CheckRequest) -> CacheKey {
        let mut hasher = Hasher::new();

        hasher.update(request.principal.id.as_bytes());
        let mut roles = request.principal.roles.clone();
        roles.sort();
        for role in &roles {
            hasher.update(role.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.update(request.principal.scope.as_bytes());
        Self::hash_attributes(&mut hasher, &request.principal.attributes);

        hasher.update(request.resource.kind.as_bytes());
        hasher.update(request.resource.id.as_bytes());
        hasher.update(request.resource.scope.as_bytes());
        Self::hash_attributes(&mut hasher, &request.resource.attributes);

        for action in &request.actions {
            hasher.update(action.as_bytes());
            hasher.update(b"\x1f");
        }
        Self::hash_attributes(&mut hasher, &request.aux_data);

        *hasher.finalize().as_bytes()
    }

    fn hash_attributes(
        hasher: &mut Hasher,
        attributes: &std::collections::HashMap<String, serde_json::Value>,
    ) {
        let mut entries: Vec<_> = attributes.iter().collect();
        entries.sort_by_key(|(key, _)| *key);
        for (key, value) in entries {
            hasher.update(key.as_bytes());
            hasher.update(value.to_string().as_bytes());
            hasher.update(b"\x1f");
        }
    }

    fn evict_some(&self) {
        let target = (self.config.capacity / 10).max(1);
        let mut removed = 0;
        self.entries.retain(|_, _| {
            if removed < target {
                removed += 1;
                false
            } else {
                true
            }
        });
    }

    fn bump(&self, key: &'static str) {
        *self.stats.entry(key).or_insert(0) += 1;
    }

    fn stat(&self, key: &'static str) -> u64 {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}
