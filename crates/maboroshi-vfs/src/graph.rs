//! Dependency graph linking generated paths to watched source patterns.
//!
//! Edges are directed generated-path → source-pattern: `link(from, to, mask)`
//! means "a change matching `mask` at `to` affects `from`". Reverse queries
//! answer "which generated paths must be recomputed when this source
//! changes", either one hop ([`DepGraph::ins`]) or transitively
//! ([`DepGraph::deep_ins`]).
//!
//! Safe for concurrent use: readers share, writers exclude.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::RwLock;

use maboroshi_glob::{glob_match, is_pattern};

use crate::types::ChangeSet;

#[derive(Default)]
struct GraphInner {
    /// from → (to → accumulated mask)
    outs: HashMap<String, HashMap<String, ChangeSet>>,
    /// to → (from → accumulated mask), mirrored for reverse queries
    ins: HashMap<String, HashMap<String, ChangeSet>>,
}

/// Directed dependency graph with reverse-reachability queries.
#[derive(Default)]
pub struct DepGraph {
    inner: RwLock<GraphInner>,
}

impl DepGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or merge an edge `from → to`.
    ///
    /// Repeated links accumulate the change mask by OR instead of
    /// duplicating the edge.
    pub fn link(&self, from: &str, to: &str, changes: ChangeSet) {
        let mut inner = self.inner.write();
        *inner
            .outs
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_insert(ChangeSet::empty()) |= changes;
        *inner
            .ins
            .entry(to.to_string())
            .or_default()
            .entry(from.to_string())
            .or_insert(ChangeSet::empty()) |= changes;
    }

    /// Remove the edge `from → to`. Returns true if it existed.
    ///
    /// Exposed for completeness; the default resolution flows only add.
    pub fn unlink(&self, from: &str, to: &str) -> bool {
        let mut inner = self.inner.write();
        let removed = inner
            .outs
            .get_mut(from)
            .is_some_and(|tos| tos.remove(to).is_some());
        if removed {
            if let Some(froms) = inner.ins.get_mut(to) {
                froms.remove(from);
            }
        }
        removed
    }

    /// Direct predecessors of `to` whose edge mask intersects `changes`,
    /// sorted by name.
    pub fn ins(&self, to: &str, changes: ChangeSet) -> Vec<String> {
        let inner = self.inner.read();
        let mut froms: Vec<String> = inner
            .ins
            .get(to)
            .map(|froms| {
                froms
                    .iter()
                    .filter(|(_, mask)| mask.intersects(changes))
                    .map(|(from, _)| from.clone())
                    .collect()
            })
            .unwrap_or_default();
        froms.sort();
        froms
    }

    /// Transitive predecessors of `to`, nearest first.
    ///
    /// Breadth-first over reverse edges: direct dependents come before
    /// dependents-of-dependents. Each node is emitted at most once even when
    /// several chains reach it, the queried node is excluded from its own
    /// closure, and a visited set terminates cycles. An edge is followed
    /// only if its mask intersects `changes`.
    pub fn deep_ins(&self, to: &str, changes: ChangeSet) -> Vec<String> {
        let inner = self.inner.read();
        let mut ordered = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(to);

        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(to);

        while let Some(node) = queue.pop_front() {
            let Some(froms) = inner.ins.get(node) else {
                continue;
            };
            let mut level: Vec<&str> = froms
                .iter()
                .filter(|(from, mask)| {
                    mask.intersects(changes) && !visited.contains(from.as_str())
                })
                .map(|(from, _)| from.as_str())
                .collect();
            level.sort();
            for from in level {
                visited.insert(from);
                ordered.push(from.to_string());
                queue.push_back(from);
            }
        }
        ordered
    }

    /// Registered source patterns that a concrete changed path satisfies.
    ///
    /// A pattern literally equal to `source_path` is ordered before every
    /// wildcard match; wildcard matches follow in lexicographic order. This
    /// is the documented tie-break rule: literal exact match beats any
    /// pattern match.
    pub fn match_patterns(&self, source_path: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut exact = Vec::new();
        let mut wild = Vec::new();
        for pattern in inner.ins.keys() {
            if pattern == source_path {
                exact.push(pattern.clone());
            } else if is_pattern(pattern) && glob_match(pattern, source_path) {
                wild.push(pattern.clone());
            }
        }
        wild.sort();
        exact.extend(wild);
        exact
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        let inner = self.inner.read();
        inner.outs.values().map(|tos| tos.len()).sum()
    }
}

impl std::fmt::Debug for DepGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepGraph")
            .field("edges", &self.edge_count())
            .finish()
    }
}
