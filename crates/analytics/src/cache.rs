//! Result cache
//!
//! TTL-bounded in-memory cache for computed analytics payloads. Entries are
//! stored as JSON values so heterogeneous results share one map; expiry is
//! lazy on read with an explicit purge for housekeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Default entry lifetime
const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    data: serde_json::Value,
    stored_at: Instant,
}

/// Hit/miss/eviction counters, snapshotted by [`AnalyticsCache::stats`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Thread-safe TTL cache for analytics results
pub struct AnalyticsCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl AnalyticsCache {
    /// Create a cache with the default 5 minute TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Fetch a cached value, evicting it if expired
    ///
    /// A stored payload that no longer deserializes as `T` counts as a miss
    /// and is dropped rather than surfaced as an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.stored_at.elapsed() < self.ttl {
                    match serde_json::from_value(entry.data.clone()) {
                        Ok(value) => {
                            self.hits.fetch_add(1, Ordering::Relaxed);
                            return Some(value);
                        }
                        Err(e) => {
                            warn!(key, error = %e, "cached payload failed to deserialize, dropping");
                            drop(entry);
                            self.entries.remove(key);
                            self.misses.fetch_add(1, Ordering::Relaxed);
                            return None;
                        }
                    }
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key, "cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value under `key`, replacing any existing entry
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(data) => {
                self.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        data,
                        stored_at: Instant::now(),
                    },
                );
            }
            Err(e) => warn!(key, error = %e, "value not serializable, skipping cache"),
        }
    }

    /// Remove one entry; returns whether it existed
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every expired entry, returning the count removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            debug!(removed, "purged expired cache entries");
        }
        removed
    }

    /// Snapshot of counters and current size
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for AnalyticsCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for deterministic cache keys
///
/// Produces `op:platform:start..end:k=v,k=v` with parameters sorted by name,
/// so the same logical request always maps to the same key.
#[derive(Debug, Clone)]
pub struct CacheKey {
    operation: String,
    platform: Option<String>,
    range: Option<(String, String)>,
    params: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            platform: None,
            range: None,
            params: Vec::new(),
        }
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.range = Some((start.into(), end.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn build(mut self) -> String {
        let mut key = self.operation;
        if let Some(platform) = self.platform {
            key.push(':');
            key.push_str(&platform);
        }
        if let Some((start, end)) = self.range {
            key.push(':');
            key.push_str(&start);
            key.push_str("..");
            key.push_str(&end);
        }
        if !self.params.is_empty() {
            self.params.sort();
            let joined: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            key.push(':');
            key.push_str(&joined.join(","));
        }
        key
    }
}
