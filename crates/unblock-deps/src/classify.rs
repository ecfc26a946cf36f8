//! Blocker classification of top-level dependencies
//!
//! For each top-level dependency D with a known latest version, every package
//! that declares a range on D (found through the reverse index) is checked:
//! if the range rejects D's latest version, D is blocked. Otherwise D is a
//! safe or major upgrade, or needs no action when already current.
//!
//! Packages whose own latest version is unknown were not resolved and never
//! block anything.

use crate::graph::DependencyGraph;
use crate::types::{AnalysisResult, Category, ClassifiedDependency, PackageRecord, PackageTable};
use crate::version::{parse_range, parse_version};
use node_semver::Version;
use std::collections::BTreeMap;
use unblock_registry::LatestVersion;

/// Latest versions by package name; missing names count as unknown
pub type LatestVersions = BTreeMap<String, LatestVersion>;

struct Violation<'a> {
    blocker: &'a str,
    range: &'a str,
}

/// Classify every top-level dependency in `table`.
///
/// Top-level records are visited in table order; each lookup costs one
/// reverse-index probe plus one range check per dependent.
pub fn classify(
    table: &PackageTable,
    graph: &DependencyGraph,
    latest: &LatestVersions,
) -> AnalysisResult {
    let mut result = AnalysisResult::default();

    for record in table.top_level() {
        let mut with_latest = record.clone();
        with_latest.latest_version = latest.get(&record.name).cloned().unwrap_or_default();

        if let Some(classified) = classify_one(&with_latest, table, graph, latest) {
            match classified.category {
                Category::Safe => result.safe.push(classified),
                Category::MajorJump => result.major_jump.push(classified),
                Category::Blocked { .. } => result.blocked.push(classified),
            }
        } else if !with_latest.latest_version.is_known() {
            result.stats.unresolved += 1;
        }

        result.top_level.push(with_latest);
    }

    result.stats.packages = table.len();
    result.stats.edges = graph.edge_count();
    result
}

/// Classify a single top-level dependency; `None` means no action.
pub fn classify_one(
    record: &PackageRecord,
    table: &PackageTable,
    graph: &DependencyGraph,
    latest: &LatestVersions,
) -> Option<ClassifiedDependency> {
    let latest_raw = record.latest_version.as_known()?;
    let Ok(candidate) = parse_version(latest_raw) else {
        tracing::debug!(
            package = %record.name,
            latest = latest_raw,
            "latest version does not parse"
        );
        return None;
    };

    let mut violations = rejecting_dependents(&record.name, &candidate, table, graph, latest);
    if let Some(first) = violations.next() {
        let blocker_count = 1 + violations.count();
        tracing::debug!(
            package = %record.name,
            blocker = first.blocker,
            range = first.range,
            blocker_count,
            "blocked"
        );
        return Some(ClassifiedDependency {
            record: record.clone(),
            latest: latest_raw.to_string(),
            category: Category::Blocked {
                blocker_name: first.blocker.to_string(),
                blocker_range: first.range.to_string(),
                blocker_count,
            },
        });
    }

    let Ok(current) = parse_version(&record.resolved_version) else {
        tracing::debug!(
            package = %record.name,
            resolved = %record.resolved_version,
            "installed version does not parse"
        );
        return None;
    };

    if current >= candidate {
        return None;
    }
    let category = if candidate.major > current.major {
        Category::MajorJump
    } else {
        Category::Safe
    };

    Some(ClassifiedDependency {
        record: record.clone(),
        latest: latest_raw.to_string(),
        category,
    })
}

/// Dependents of `name`, in name order, whose declared range rejects `candidate`
fn rejecting_dependents<'a>(
    name: &'a str,
    candidate: &'a Version,
    table: &'a PackageTable,
    graph: &'a DependencyGraph,
    latest: &'a LatestVersions,
) -> impl Iterator<Item = Violation<'a>> + 'a {
    graph.dependents_of(name).filter_map(move |dependent| {
        if dependent == name {
            return None;
        }
        if !latest.get(dependent).is_some_and(LatestVersion::is_known) {
            return None;
        }
        let requirer = table.get(dependent)?;
        let range = requirer.range_for(name)?;
        let parsed = parse_range(range).ok()?;

        (!parsed.satisfies(candidate)).then_some(Violation {
            blocker: dependent,
            range,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Fixture {
        table: PackageTable,
        latest: LatestVersions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                table: PackageTable::new(),
                latest: LatestVersions::new(),
            }
        }

        fn top(mut self, name: &str, range: &str, resolved: &str, latest: Option<&str>) -> Self {
            let mut record = PackageRecord::new(name, resolved);
            record.requested_range = Some(range.to_string());
            self.table.insert(record);
            self.set_latest(name, latest);
            self
        }

        fn installed(
            mut self,
            name: &str,
            deps: &[(&str, &str)],
            peers: &[(&str, &str)],
            latest: Option<&str>,
        ) -> Self {
            let mut record = PackageRecord::new(name, "1.0.0");
            for (dep, range) in deps {
                record.dependency_ranges.insert(dep.to_string(), range.to_string());
            }
            for (dep, range) in peers {
                record.peer_dependency_ranges.insert(dep.to_string(), range.to_string());
            }
            self.table.insert(record);
            self.set_latest(name, latest);
            self
        }

        fn set_latest(&mut self, name: &str, latest: Option<&str>) {
            let value = latest
                .map(|v| LatestVersion::Known(v.to_string()))
                .unwrap_or_default();
            self.latest.insert(name.to_string(), value);
        }

        fn run(&self) -> AnalysisResult {
            let graph = DependencyGraph::build(&self.table);
            classify(&self.table, &graph, &self.latest)
        }
    }

    fn names(bucket: &[ClassifiedDependency]) -> Vec<&str> {
        bucket.iter().map(|c| c.name()).collect()
    }

    #[test]
    fn test_simple_safe_upgrade() {
        let result = Fixture::new()
            .top("lodash", "^4.1.0", "4.1.0", Some("4.2.0"))
            .run();

        assert_eq!(names(&result.safe), ["lodash"]);
        assert!(result.blocked.is_empty());
        assert!(result.major_jump.is_empty());
        assert_eq!(result.top_level[0].latest_version.as_known(), Some("4.2.0"));
    }

    #[test]
    fn test_blocked_upgrade() {
        let result = Fixture::new()
            .top("react", "^18.0.0", "18.2.0", Some("18.3.0"))
            .installed("old-ui-kit", &[("react", "^17.0.0")], &[], Some("2.0.0"))
            .run();

        assert_eq!(names(&result.blocked), ["react"]);
        assert_eq!(result.blocked[0].category.blocker_name(), Some("old-ui-kit"));
        assert!(result.safe.is_empty());
    }

    #[test]
    fn test_major_jump() {
        let result = Fixture::new()
            .top("lodash", "^4.1.0", "4.1.0", Some("5.0.0"))
            .run();

        assert_eq!(names(&result.major_jump), ["lodash"]);
        assert!(result.safe.is_empty());
    }

    #[test]
    fn test_peer_dependency_blocks() {
        let result = Fixture::new()
            .top("react", "^18.0.0", "18.2.0", Some("19.0.0"))
            .installed("legacy-modal", &[], &[("react", "^16.8.0 || ^17 || ^18")], Some("3.1.0"))
            .run();

        assert_eq!(names(&result.blocked), ["react"]);
        assert_eq!(result.blocked[0].category.blocker_name(), Some("legacy-modal"));
        assert!(result.major_jump.is_empty());
    }

    #[test]
    fn test_unknown_latest_is_skipped_and_cannot_block() {
        let result = Fixture::new()
            .top("react", "^18.0.0", "18.2.0", Some("18.3.0"))
            .top("left-pad", "^1.0.0", "1.0.0", None)
            .installed("old-ui-kit", &[("react", "^17.0.0")], &[], None)
            .run();

        assert_eq!(names(&result.safe), ["react"]);
        assert!(result.blocked.is_empty());
        assert!(result.classified().all(|c| c.name() != "left-pad"));
        assert_eq!(result.stats.unresolved, 1);
        assert_eq!(result.top_level.len(), 2);
    }

    #[test]
    fn test_blocker_wins_over_major_jump() {
        let result = Fixture::new()
            .top("typescript", "^4.9.0", "4.9.5", Some("5.4.0"))
            .installed("ts-old-plugin", &[("typescript", "~4.9.0")], &[], Some("1.0.0"))
            .run();

        assert_eq!(names(&result.blocked), ["typescript"]);
        assert!(result.major_jump.is_empty());
    }

    #[test]
    fn test_first_blocker_by_name_and_count() {
        let result = Fixture::new()
            .top("react", "^18.0.0", "18.2.0", Some("19.0.0"))
            .installed("zeta-kit", &[("react", "^18.0.0")], &[], Some("1.0.0"))
            .installed("alpha-kit", &[("react", "^17.0.0")], &[], Some("1.0.0"))
            .installed("happy-kit", &[("react", ">=16")], &[], Some("1.0.0"))
            .run();

        match &result.blocked[0].category {
            Category::Blocked {
                blocker_name,
                blocker_range,
                blocker_count,
            } => {
                assert_eq!(blocker_name, "alpha-kit");
                assert_eq!(blocker_range, "^17.0.0");
                assert_eq!(*blocker_count, 2);
            }
            other => panic!("expected blocked, got {other:?}"),
        }
    }

    #[test]
    fn test_current_or_ahead_needs_no_action() {
        let result = Fixture::new()
            .top("vite", "^5.0.0", "5.2.0", Some("5.2.0"))
            .top("next", "^14.0.0", "14.3.0-canary.1", Some("14.2.0"))
            .run();

        assert_eq!(result.classified().count(), 0);
        assert_eq!(result.stats.unresolved, 0);
    }

    #[test]
    fn test_dependency_range_checked_before_peer_range() {
        let result = Fixture::new()
            .top("react", "^18.0.0", "18.2.0", Some("18.3.0"))
            .installed(
                "dual-kit",
                &[("react", "^18.0.0")],
                &[("react", "^17.0.0")],
                Some("1.0.0"),
            )
            .run();

        assert_eq!(names(&result.safe), ["react"]);
    }

    #[test]
    fn test_non_registry_ranges_and_versions_are_ignored() {
        let result = Fixture::new()
            .top("react", "^18.0.0", "18.2.0", Some("18.3.0"))
            .top("internal", "file:../internal", "0.0.0-local", Some("not-a-version"))
            .installed("linked", &[("react", "file:../react")], &[], Some("1.0.0"))
            .run();

        assert_eq!(names(&result.safe), ["react"]);
        assert!(result.classified().all(|c| c.name() != "internal"));
    }

    #[test]
    fn test_each_dependency_in_at_most_one_bucket() {
        let result = Fixture::new()
            .top("a", "^1.0.0", "1.0.0", Some("1.1.0"))
            .top("b", "^1.0.0", "1.0.0", Some("2.0.0"))
            .top("c", "^1.0.0", "1.0.0", Some("1.5.0"))
            .top("d", "^1.0.0", "1.5.0", Some("1.5.0"))
            .installed("x", &[("c", "~1.0.0")], &[], Some("1.0.0"))
            .run();

        for name in ["a", "b", "c", "d"] {
            let hits = [&result.safe, &result.blocked, &result.major_jump]
                .iter()
                .filter(|bucket| bucket.iter().any(|c| c.name() == name))
                .count();
            let expected = usize::from(name != "d");
            assert_eq!(hits, expected, "{name}");
        }
    }

    fn synthetic(n: usize) -> Fixture {
        let mut fixture = Fixture::new();
        for i in 0..n {
            fixture = fixture.top(&format!("top-{i}"), "^1.0.0", "1.0.0", Some("1.1.0"));
        }
        for i in 0..n {
            let deps = [
                (format!("top-{}", i % n), "^1.0.0".to_string()),
                (format!("top-{}", (i * 7 + 3) % n), "~1.0.0".to_string()),
                (format!("dep-{}", (i + 1) % n), "^1.0.0".to_string()),
            ];
            let deps: Vec<(&str, &str)> =
                deps.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
            fixture = fixture.installed(&format!("dep-{i}"), &deps, &[], Some("1.0.0"));
        }
        fixture
    }

    #[test]
    fn test_classification_scales_linearly() {
        let small = synthetic(500);
        let large = synthetic(4_000);

        let time = |fixture: &Fixture| {
            let graph = DependencyGraph::build(&fixture.table);
            let start = Instant::now();
            for _ in 0..3 {
                std::hint::black_box(classify(&fixture.table, &graph, &fixture.latest));
            }
            start.elapsed()
        };

        // warm up
        time(&small);
        let small_time = time(&small).as_secs_f64().max(1e-6);
        let large_time = time(&large).as_secs_f64();

        // 8x the input; quadratic behaviour would be ~64x
        assert!(
            large_time / small_time < 30.0,
            "small {small_time:.4}s large {large_time:.4}s"
        );

        let result = classify(
            &large.table,
            &DependencyGraph::build(&large.table),
            &large.latest,
        );
        assert_eq!(
            result.safe.len() + result.blocked.len() + result.major_jump.len(),
            4_000
        );
    }
}
