//! TTL cache for latest-version lookups

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for cached versions.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    version: String,
    stored_at: Instant,
}

/// Package name -> latest version, expiring after a fixed TTL.
///
/// Owned by a single [`crate::VersionResolver`]; expired entries behave as
/// absent and are dropped lazily. Only successful lookups are stored, so a
/// transient failure is retried on the next run.
#[derive(Debug, Clone)]
pub struct VersionCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl VersionCache {
    /// Create an empty cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached version for `name` if present and not expired
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.version.as_str())
    }

    /// Store a freshly resolved version
    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.entries.insert(
            name.into(),
            CacheEntry {
                version: version.into(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed
    pub fn evict_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        before - self.entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for VersionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
