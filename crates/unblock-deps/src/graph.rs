//! Forward and reverse dependency adjacency over installed packages

use crate::PackageTable;
use std::collections::{BTreeSet, HashMap};

/// Who depends on whom, keyed by logical package name.
///
/// Built once from a fully loaded [`PackageTable`] and never mutated.
/// `reverse[b]` contains `a` exactly when `forward[a]` contains `b`. Edges may
/// point at names that are not installed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    forward: HashMap<String, BTreeSet<String>>,
    reverse: HashMap<String, BTreeSet<String>>,
    edges: usize,
}

impl DependencyGraph {
    /// Build both indexes in one pass over the table
    pub fn build(table: &PackageTable) -> Self {
        let mut graph = Self::default();

        for record in table.iter() {
            let targets = graph.forward.entry(record.name.clone()).or_default();
            for dependency in record.dependency_names() {
                if targets.insert(dependency.to_string()) {
                    graph
                        .reverse
                        .entry(dependency.to_string())
                        .or_default()
                        .insert(record.name.clone());
                    graph.edges += 1;
                }
            }
        }

        graph
    }

    /// Names `name` depends on (regular and peer), in name order
    pub fn dependencies_of(&self, name: &str) -> impl Iterator<Item = &str> {
        self.forward
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Names that declare a range on `name`, in name order
    pub fn dependents_of(&self, name: &str) -> impl Iterator<Item = &str> {
        self.reverse
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Number of packages with a forward entry
    pub fn node_count(&self) -> usize {
        self.forward.len()
    }

    /// Number of distinct dependency edges
    pub fn edge_count(&self) -> usize {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackageRecord;

    fn record(name: &str, deps: &[&str], peers: &[&str]) -> PackageRecord {
        let mut record = PackageRecord::new(name, "1.0.0");
        for dep in deps {
            record.dependency_ranges.insert(dep.to_string(), "*".into());
        }
        for peer in peers {
            record.peer_dependency_ranges.insert(peer.to_string(), "*".into());
        }
        record
    }

    #[test]
    fn test_reverse_mirrors_forward() {
        let table: PackageTable = [
            record("app-shell", &["react", "zod"], &[]),
            record("old-ui-kit", &["react"], &["react-dom"]),
            record("react-dom", &["scheduler"], &["react"]),
            record("react", &[], &[]),
        ]
        .into_iter()
        .collect();
        let graph = DependencyGraph::build(&table);

        let dependents: Vec<&str> = graph.dependents_of("react").collect();
        assert_eq!(dependents, ["app-shell", "old-ui-kit", "react-dom"]);
        assert_eq!(graph.dependents_of("react-dom").collect::<Vec<_>>(), ["old-ui-kit"]);
        assert_eq!(graph.dependents_of("zod").collect::<Vec<_>>(), ["app-shell"]);
        assert_eq!(graph.dependents_of("missing").count(), 0);

        for record in table.iter() {
            for dep in graph.dependencies_of(&record.name) {
                assert!(graph.dependents_of(dep).any(|d| d == record.name));
            }
        }
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn test_dependency_and_peer_on_same_name_is_one_edge() {
        let table: PackageTable = [record("plugin", &["core"], &["core"])].into_iter().collect();
        let graph = DependencyGraph::build(&table);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependents_of("core").collect::<Vec<_>>(), ["plugin"]);
    }
}
