//! Path index: a segment trie mapping registered paths to generators.
//!
//! Lookups walk the segments of the query path, so exact and
//! longest-prefix resolution cost is proportional to path depth, not to the
//! number of registrations. Prefixes only match at segment boundaries:
//! registering `view` never captures `viewer/x`.

use std::collections::HashMap;

use crate::generator::{Generator, GeneratorKind};
use crate::path;

/// Immediate-child summary used by directory synthesis.
#[derive(Debug, Clone)]
pub struct ChildSummary {
    /// Segment name.
    pub name: String,
    /// Terminal generator kind at this segment, if one is registered.
    pub kind: Option<GeneratorKind>,
    /// True if registrations exist deeper than this segment.
    pub has_descendants: bool,
}

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    value: Option<Generator>,
}

/// Segment trie over registered generator paths.
///
/// Registration is first-write-wins: [`PathIndex::set`] reports whether it
/// inserted, and repeated registration of the same path is a no-op. Call
/// sites rely on this for idempotent incremental `add` calls.
#[derive(Default)]
pub struct PathIndex {
    root: Node,
    len: usize,
}

impl PathIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register a generator at `path` (normalized, non-root).
    ///
    /// Returns true if the registration was inserted, false if the path was
    /// already owned (the existing generator is kept) or is the root.
    pub fn set(&mut self, path: &str, generator: Generator) -> bool {
        if path::is_root(path) {
            // The root is always synthesized, never owned by a generator.
            return false;
        }
        let mut node = &mut self.root;
        for segment in path.split('/') {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if node.value.is_some() {
            return false;
        }
        node.value = Some(generator);
        self.len += 1;
        true
    }

    /// Exact-match lookup.
    pub fn get(&self, path: &str) -> Option<&Generator> {
        self.node_at(path)?.value.as_ref()
    }

    /// Longest-prefix lookup at segment boundaries.
    ///
    /// Returns the longest registered path that is `path` itself or an
    /// ancestor of it, with its generator.
    pub fn get_by_prefix(&self, path: &str) -> Option<(String, &Generator)> {
        if path::is_root(path) {
            return None;
        }
        let mut node = &self.root;
        let mut walked = 0usize;
        let mut best: Option<(usize, &Generator)> = None;
        for segment in path.split('/') {
            let Some(next) = node.children.get(segment) else {
                break;
            };
            node = next;
            walked += segment.len() + 1;
            if let Some(generator) = &node.value {
                best = Some((walked - 1, generator));
            }
        }
        best.map(|(end, generator)| (path[..end].to_string(), generator))
    }

    /// True if any registration starts with this root segment.
    pub fn has_root(&self, segment: &str) -> bool {
        self.root.children.contains_key(segment)
    }

    /// Immediate children below `dir`, or `None` when nothing is registered
    /// at or under it.
    pub fn children_of(&self, dir: &str) -> Option<Vec<ChildSummary>> {
        let node = self.node_at(dir)?;
        if node.children.is_empty() && node.value.is_none() {
            return None;
        }
        let mut children: Vec<ChildSummary> = node
            .children
            .iter()
            .map(|(name, child)| ChildSummary {
                name: name.clone(),
                kind: child.value.as_ref().map(|g| g.kind()),
                has_descendants: !child.children.is_empty(),
            })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Some(children)
    }

    fn node_at(&self, path: &str) -> Option<&Node> {
        if path::is_root(path) {
            return Some(&self.root);
        }
        let mut node = &self.root;
        for segment in path.split('/') {
            node = node.children.get(segment)?;
        }
        Some(node)
    }
}

impl std::fmt::Debug for PathIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathIndex").field("len", &self.len).finish()
    }
}
