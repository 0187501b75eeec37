//! TTL cache for classification verdicts
//!
//! Short phrases like "yes" and "no" repeat across sessions; re-classifying
//! them burns a model call for nothing. The cache is process-wide, keyed by
//! classifier kind plus normalized text. Stale or duplicate entries are
//! harmless: this is purely a latency/cost optimization.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Concurrent TTL cache for classifier verdicts
pub struct ClassifyCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl ClassifyCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Cache key for a classifier kind and raw user text
    pub fn key(kind: &str, text: &str) -> String {
        format!("{kind}:{}", text.trim().to_lowercase())
    }

    /// Get a value if present and unexpired
    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Insert with the default TTL
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL
    pub fn insert_with_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Duration,
    ) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value: value.into(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ClassifyCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}
