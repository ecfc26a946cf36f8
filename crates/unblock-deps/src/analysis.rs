//! End-to-end blocker analysis with staged version resolution
//!
//! Stage 1 resolves the top-level dependencies. Any whose latest version is
//! newer than the installed one is "potentially blocked"; stage 2 then
//! resolves only the transitive packages that declare a range on one of
//! those names. Everything else stays unknown and cannot block.

use crate::classify::{classify, LatestVersions};
use crate::graph::DependencyGraph;
use crate::npm::ProjectSnapshot;
use crate::version::{is_valid_package_name, parse_version};
use crate::{AnalysisResult, Error, PackageTable, Result};
use std::collections::BTreeSet;
use unblock_registry::{LatestVersionSource, ProgressSink, VersionResolver};

/// Stage label for top-level lookups
pub const TOP_LEVEL_STAGE: &str = "top-level";

/// Stage label for blocker lookups
pub const BLOCKER_STAGE: &str = "blockers";

/// Knobs for one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Treat `devDependencies` as top-level
    pub include_dev: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self { include_dev: true }
    }
}

/// Runs analyses against one resolver, reusing its cache between runs
pub struct Analyzer<S> {
    resolver: VersionResolver<S>,
    options: AnalysisOptions,
}

impl<S: LatestVersionSource> Analyzer<S> {
    /// Analyzer with default options
    pub fn new(resolver: VersionResolver<S>) -> Self {
        Self::with_options(resolver, AnalysisOptions::default())
    }

    /// Analyzer with explicit options
    pub fn with_options(resolver: VersionResolver<S>, options: AnalysisOptions) -> Self {
        Self { resolver, options }
    }

    /// The underlying resolver
    pub fn resolver(&self) -> &VersionResolver<S> {
        &self.resolver
    }

    /// Classify the top-level dependencies of `snapshot`.
    ///
    /// # Errors
    /// [`Error::Resolution`] when the registry is unreachable before a stage
    /// that needs it. Individual lookup failures only leave that package
    /// unknown.
    pub async fn analyze(
        &mut self,
        snapshot: &ProjectSnapshot,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<AnalysisResult> {
        let table = self.scoped_table(&snapshot.table);
        let graph = DependencyGraph::build(&table);

        tracing::info!(
            packages = table.len(),
            edges = graph.edge_count(),
            top_level = table.top_level().count(),
            "analyzing dependencies"
        );

        let top_level = resolvable(table.top_level().map(|r| r.name.as_str()));
        let mut latest = self
            .resolver
            .resolve_all(&top_level, TOP_LEVEL_STAGE, progress)
            .await
            .map_err(|source| Error::Resolution {
                stage: TOP_LEVEL_STAGE.to_string(),
                source,
            })?;

        let candidates = blocker_candidates(&table, &graph, &latest);
        tracing::info!(candidates = candidates.len(), "selected blocker candidates");

        if !candidates.is_empty() {
            let resolved = self
                .resolver
                .resolve_all(&candidates, BLOCKER_STAGE, progress)
                .await
                .map_err(|source| Error::Resolution {
                    stage: BLOCKER_STAGE.to_string(),
                    source,
                })?;
            latest.extend(resolved);
        }

        let mut result = classify(&table, &graph, &latest);
        result.not_installed = snapshot.not_installed.clone();
        result.stats.top_level_lookups = top_level.len();
        result.stats.blocker_lookups = candidates.len();

        tracing::info!(
            safe = result.safe.len(),
            blocked = result.blocked.len(),
            major = result.major_jump.len(),
            unresolved = result.stats.unresolved,
            "analysis complete"
        );

        Ok(result)
    }

    fn scoped_table(&self, table: &PackageTable) -> PackageTable {
        if self.options.include_dev {
            return table.clone();
        }
        table
            .iter()
            .cloned()
            .map(|mut record| {
                if record.is_dev {
                    record.requested_range = None;
                }
                record
            })
            .collect()
    }
}

/// Top-level dependencies whose latest version is newer than the installed one.
///
/// A latest version still inside the manifest range can be held back by a
/// transitive range, so the manifest range plays no part here.
pub fn potentially_blocked<'a>(
    table: &'a PackageTable,
    latest: &'a LatestVersions,
) -> impl Iterator<Item = &'a str> + 'a {
    table.top_level().filter_map(|record| {
        let candidate = parse_version(latest.get(&record.name)?.as_known()?).ok()?;
        let current = parse_version(&record.resolved_version).ok()?;
        (candidate > current).then_some(record.name.as_str())
    })
}

/// Names to resolve in the blocker stage: non-top-level dependents of
/// potentially blocked packages, with valid names, not yet resolved.
pub fn blocker_candidates(
    table: &PackageTable,
    graph: &DependencyGraph,
    latest: &LatestVersions,
) -> Vec<String> {
    let mut candidates = BTreeSet::new();
    for name in potentially_blocked(table, latest) {
        for dependent in graph.dependents_of(name) {
            let eligible = table
                .get(dependent)
                .is_some_and(|record| !record.is_top_level())
                && !latest.contains_key(dependent)
                && is_valid_package_name(dependent);
            if eligible {
                candidates.insert(dependent.to_string());
            }
        }
    }
    candidates.into_iter().collect()
}

fn resolvable<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .filter(|name| {
            let valid = is_valid_package_name(name);
            if !valid {
                tracing::debug!(package = name, "invalid package name, not resolving");
            }
            valid
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use unblock_registry::testing::{RecordingProgress, StaticVersionSource};
    use unblock_registry::{ResolverConfig, RetryPolicy, VersionCache};

    const MANIFEST: &str = r#"{
        "dependencies": {
            "react": "^17.0.0",
            "lodash": "^4.1.0",
            "Bad_Top": "^1.0.0"
        },
        "devDependencies": { "vitest": "^1.0.0" }
    }"#;

    const LOCKFILE: &str = r#"{
        "lockfileVersion": 3,
        "packages": {
            "": {},
            "node_modules/react": { "version": "17.0.2" },
            "node_modules/lodash": { "version": "4.1.0" },
            "node_modules/Bad_Top": { "version": "1.0.0" },
            "node_modules/vitest": { "version": "1.0.0", "dev": true },
            "node_modules/old-ui-kit": {
                "version": "1.0.0",
                "dependencies": { "react": "^17.0.0" }
            },
            "node_modules/react-modal": {
                "version": "3.0.0",
                "peerDependencies": { "react": "^17.0.0 || ^18.0.0" }
            },
            "node_modules/lodash-helper": {
                "version": "1.0.0",
                "dependencies": { "lodash": "^4.0.0" }
            }
        }
    }"#;

    fn analyzer(source: Arc<StaticVersionSource>) -> Analyzer<Arc<StaticVersionSource>> {
        let config = ResolverConfig {
            retry: RetryPolicy::none(),
            ..ResolverConfig::default()
        };
        Analyzer::new(VersionResolver::with_config(source, VersionCache::default(), config))
    }

    fn registry() -> StaticVersionSource {
        StaticVersionSource::new()
            .with_version("react", "18.3.0")
            .with_version("lodash", "4.1.0")
            .with_version("vitest", "1.6.0")
            .with_version("old-ui-kit", "1.2.0")
            .with_version("react-modal", "3.16.0")
            .with_version("lodash-helper", "1.1.0")
    }

    #[tokio::test]
    async fn test_stage_two_fetches_only_dependents_of_potentially_blocked() {
        let source = Arc::new(registry());
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();
        let mut analyzer = analyzer(source.clone());

        let result = analyzer.analyze(&snapshot, None).await.unwrap();

        assert_eq!(
            source.requested_names(),
            ["lodash", "old-ui-kit", "react", "react-modal", "vitest"]
        );
        assert_eq!(source.calls_for("lodash-helper"), 0);
        assert_eq!(source.calls_for("Bad_Top"), 0);
        assert_eq!(result.stats.top_level_lookups, 3);
        assert_eq!(result.stats.blocker_lookups, 2);

        assert_eq!(
            result.category_of("react").and_then(|c| c.blocker_name()),
            Some("old-ui-kit")
        );
        assert!(result.category_of("lodash").is_none());
        assert_eq!(result.category_of("vitest").map(|c| c.label()), Some("safe"));
        assert!(result.category_of("Bad_Top").is_none());
        assert_eq!(result.top_level.len(), 4);
    }

    #[tokio::test]
    async fn test_in_range_upgrade_blocked_by_transitive_range() {
        let manifest = r#"{ "dependencies": { "react": "^18.0.0" } }"#;
        let lockfile = r#"{
            "lockfileVersion": 3,
            "packages": {
                "": {},
                "node_modules/react": { "version": "18.2.0" },
                "node_modules/old-ui-kit": {
                    "version": "1.0.0",
                    "dependencies": { "react": "^17.0.0" }
                }
            }
        }"#;
        let source = Arc::new(
            StaticVersionSource::new()
                .with_version("react", "18.3.0")
                .with_version("old-ui-kit", "1.0.0"),
        );
        let snapshot = ProjectSnapshot::from_contents(manifest, lockfile).unwrap();

        let result = analyzer(source.clone()).analyze(&snapshot, None).await.unwrap();

        assert_eq!(source.calls_for("old-ui-kit"), 1);
        assert_eq!(result.stats.blocker_lookups, 1);
        assert_eq!(
            result.category_of("react").and_then(|c| c.blocker_name()),
            Some("old-ui-kit")
        );
        assert!(result.safe.is_empty());
    }

    #[tokio::test]
    async fn test_progress_spans_both_stages() {
        let source = Arc::new(registry());
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();
        let progress = RecordingProgress::new();

        analyzer(source)
            .analyze(&snapshot, Some(&progress))
            .await
            .unwrap();

        let events = progress.events();
        assert_eq!(events.first().map(String::as_str), Some("begin:3:top-level"));
        assert!(events.contains(&"begin:2:blockers".to_string()));
        assert_eq!(events.iter().filter(|e| *e == "end").count(), 2);
    }

    #[tokio::test]
    async fn test_same_result_without_progress() {
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();
        let with = analyzer(Arc::new(registry()))
            .analyze(&snapshot, Some(&RecordingProgress::new()))
            .await
            .unwrap();
        let without = analyzer(Arc::new(registry()))
            .analyze(&snapshot, None)
            .await
            .unwrap();
        assert_eq!(with, without);
    }

    #[tokio::test]
    async fn test_exclude_dev() {
        let source = Arc::new(registry());
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();
        let mut analyzer = Analyzer::with_options(
            VersionResolver::new(source.clone(), VersionCache::default()),
            AnalysisOptions { include_dev: false },
        );

        let result = analyzer.analyze(&snapshot, None).await.unwrap();
        assert_eq!(source.calls_for("vitest"), 0);
        assert!(result.top_level.iter().all(|r| r.name != "vitest"));
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_an_error() {
        let source = Arc::new(registry().unreachable());
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();

        let err = analyzer(source).analyze(&snapshot, None).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Resolution);
    }

    #[tokio::test]
    async fn test_failed_lookups_leave_packages_unclassified() {
        let source = Arc::new(
            StaticVersionSource::new()
                .with_version("lodash", "4.1.0")
                .with_not_found("react")
                .with_version("vitest", "1.6.0"),
        );
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();

        let result = analyzer(source.clone()).analyze(&snapshot, None).await.unwrap();
        assert!(result.category_of("react").is_none());
        assert_eq!(result.stats.blocker_lookups, 0);
        assert_eq!(source.calls_for("old-ui-kit"), 0);
        assert_eq!(result.stats.unresolved, 2);
    }

    #[tokio::test]
    async fn test_second_run_served_from_cache() {
        let source = Arc::new(registry());
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();
        let mut analyzer = analyzer(source.clone());

        let first = analyzer.analyze(&snapshot, None).await.unwrap();
        let calls = source.total_calls();
        let second = analyzer.analyze(&snapshot, None).await.unwrap();

        assert_eq!(source.total_calls(), calls);
        assert_eq!(first, second);
    }
}
