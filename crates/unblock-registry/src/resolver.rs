//! Batched, cached latest-version resolution

use crate::cache::VersionCache;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::retry::{retry, RetryPolicy};
use crate::source::LatestVersionSource;
use crate::types::LatestVersion;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Tuning knobs for [`VersionResolver`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Retry/backoff policy for a single lookup
    pub retry: RetryPolicy,
    /// Timeout for one lookup attempt; a timeout counts as retryable
    pub request_timeout: Duration,
    /// Lower bound on in-flight lookups per batch
    pub min_concurrency: usize,
    /// Upper bound on in-flight lookups per batch
    pub max_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            min_concurrency: 3,
            max_concurrency: 8,
        }
    }
}

impl ResolverConfig {
    /// In-flight limit for a run of `pending` lookups.
    ///
    /// Grows by one per ten names, clamped to `[min_concurrency, max_concurrency]`.
    /// A `max_concurrency` below the minimum wins.
    pub fn concurrency_for(&self, pending: usize) -> usize {
        let max = self.max_concurrency.max(1);
        let min = self.min_concurrency.clamp(1, max);
        (pending / 10).clamp(min, max)
    }
}

/// Resolves package names to their latest published versions.
///
/// Owns its [`VersionCache`]: construct a fresh resolver per test, or keep
/// one alive across analyses to reuse cached answers. Individual failures
/// become [`LatestVersion::Unknown`]; only an unreachable registry is an error.
pub struct VersionResolver<S> {
    source: S,
    cache: VersionCache,
    config: ResolverConfig,
}

impl<S: LatestVersionSource> VersionResolver<S> {
    /// Resolver with default tuning
    pub fn new(source: S, cache: VersionCache) -> Self {
        Self::with_config(source, cache, ResolverConfig::default())
    }

    /// Resolver with explicit tuning
    pub fn with_config(source: S, cache: VersionCache, config: ResolverConfig) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    /// The underlying version source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The version cache
    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    /// Active tuning
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a single name (cache first, then the source)
    pub async fn resolve_one(&mut self, name: &str) -> LatestVersion {
        if let Some(version) = self.cache.get(name) {
            return LatestVersion::Known(version.to_string());
        }
        let resolved = lookup(&self.source, &self.config, name).await;
        if let LatestVersion::Known(version) = &resolved {
            self.cache.insert(name, version.clone());
        }
        resolved
    }

    /// Resolve every name in `names`.
    ///
    /// Duplicates are looked up once. Cache misses are fetched in sequential
    /// batches of at most [`ResolverConfig::concurrency_for`] concurrent
    /// lookups. `progress` (if any) sees one `begin`, one `advance` per
    /// distinct name, and one `end`.
    ///
    /// # Errors
    /// [`Error::Unreachable`] when there are cache misses and the source's
    /// reachability probe fails before any lookup starts.
    pub async fn resolve_all(
        &mut self,
        names: &[String],
        label: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<BTreeMap<String, LatestVersion>> {
        let evicted = self.cache.evict_expired();
        if evicted > 0 {
            tracing::debug!(evicted, "dropped expired cache entries");
        }

        let mut seen = HashSet::new();
        let unique: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect();

        let mut resolved = BTreeMap::new();
        let mut misses = Vec::new();
        for name in &unique {
            match self.cache.get(name) {
                Some(version) => {
                    resolved.insert(name.to_string(), LatestVersion::Known(version.to_string()));
                }
                None => misses.push(*name),
            }
        }

        if !misses.is_empty() {
            self.source.ping().await.map_err(|e| match e {
                Error::Unreachable(_) => e,
                other => Error::Unreachable(other.to_string()),
            })?;
        }

        tracing::info!(
            stage = label,
            total = unique.len(),
            cached = unique.len() - misses.len(),
            "resolving latest versions"
        );

        if let Some(sink) = progress {
            sink.begin(unique.len(), label);
            for name in resolved.keys() {
                sink.advance(name);
            }
        }

        let limit = self.config.concurrency_for(misses.len());
        for batch in misses.chunks(limit) {
            let source = &self.source;
            let config = &self.config;
            let results = join_all(batch.iter().map(|name| async move {
                (*name, lookup(source, config, name).await)
            }))
            .await;

            for (name, latest) in results {
                if let LatestVersion::Known(version) = &latest {
                    self.cache.insert(name, version.clone());
                }
                if let Some(sink) = progress {
                    sink.advance(name);
                }
                resolved.insert(name.to_string(), latest);
            }
        }

        if let Some(sink) = progress {
            sink.end();
        }

        Ok(resolved)
    }
}

async fn lookup<S: LatestVersionSource>(
    source: &S,
    config: &ResolverConfig,
    name: &str,
) -> LatestVersion {
    let timeout = config.request_timeout;
    let outcome = retry(&config.retry, name, move || async move {
        tokio::time::timeout(timeout, source.latest_version(name))
            .await
            .map_err(|_| Error::Timeout(name.to_string()))?
    })
    .await;

    match outcome {
        Ok(version) => {
            tracing::debug!(package = name, version = %version, "resolved");
            LatestVersion::Known(version)
        }
        Err(e) => {
            tracing::warn!(package = name, error = %e, "could not resolve latest version");
            LatestVersion::Unknown
        }
    }
}
