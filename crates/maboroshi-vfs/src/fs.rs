//! The GenFs front door.
//!
//! Resolution of a request path:
//!
//! 1. The root merges the synthesized virtual root with the real
//!    filesystem's root listing (generator entries win on name collisions).
//! 2. A root segment no generator ever introduced delegates entirely to the
//!    real filesystem, with its "not found" translated to the canonical
//!    [`VfsError::NotExist`].
//! 3. Otherwise the path resolves against the index: exact match invokes
//!    the generator; a prefix match descends into the matched directory
//!    generator's scoped index (or hands the remainder to a serve
//!    generator); with neither, a directory is synthesized from the
//!    registrations sharing the path as a prefix, or the path does not
//!    exist.
//!
//! Every handle reports the originally requested path, not whatever
//! generator-relative path resolution walked through internally.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;

use crate::backends::RealFs;
use crate::bus::{EventBus, Subscription};
use crate::cache::Memo;
use crate::error::{VfsError, VfsResult};
use crate::generator::{DirBuilder, DirFn, DirSpec, FileOutput, Generator};
use crate::graph::DepGraph;
use crate::index::PathIndex;
use crate::path;
use crate::synth;
use crate::types::{ChangeEvent, ChangeSet, DirEntry, FileAttr, FileType};

/// Generator-backed virtual filesystem.
///
/// Read-only and safe for concurrent use: resolutions of distinct paths
/// proceed in parallel, and concurrent resolutions of the same
/// not-yet-cached path share a single generator invocation.
pub struct GenFs {
    /// Top-level generator registrations.
    index: RwLock<PathIndex>,
    /// Memoized file generator outputs, keyed by requested path.
    files: Memo<Arc<FileOutput>>,
    /// Memoized directory generator results, keyed by directory path.
    dirs: Memo<Arc<DirSpec>>,
    /// Generated-path → source-pattern dependency edges.
    graph: DepGraph,
    /// Stale-path notification bus.
    bus: EventBus,
    /// Real filesystem merged in below the generators, if any.
    real: Option<Arc<dyn RealFs>>,
}

/// What a path resolved to, before a handle is built.
enum Resolved {
    File(Arc<FileOutput>),
    Dir(Vec<DirEntry>),
}

impl Default for GenFs {
    fn default() -> Self {
        Self::new()
    }
}

impl GenFs {
    /// Create a virtual filesystem with no real-filesystem fallthrough.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(PathIndex::new()),
            files: Memo::new(),
            dirs: Memo::new(),
            graph: DepGraph::new(),
            bus: EventBus::default(),
            real: None,
        }
    }

    /// Create a virtual filesystem overlaying a real one.
    ///
    /// Paths under generator roots resolve virtually; everything else falls
    /// through to `real`, and the root listing merges both sides.
    pub fn overlay(real: impl RealFs + 'static) -> Self {
        let mut fs = Self::new();
        fs.real = Some(Arc::new(real));
        fs
    }

    /// The dependency graph.
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Register generators. Incremental and idempotent: first registration
    /// of a path wins and re-registration is a no-op. Returns how many were
    /// inserted.
    ///
    /// Not safe to call from inside a generator callback for its own path,
    /// whose result is being memoized at that point.
    pub fn add<I, S>(&self, generators: I) -> usize
    where
        I: IntoIterator<Item = (S, Generator)>,
        S: Into<String>,
    {
        let mut index = self.index.write();
        let mut inserted = 0;
        for (p, generator) in generators {
            if index.set(&path::clean(&p.into()), generator) {
                inserted += 1;
            }
        }
        inserted
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Open a path, producing a [`Handle`].
    pub async fn open(&self, requested: &str) -> VfsResult<Handle> {
        let full = path::clean(requested);
        let body = match self.resolve(&full).await? {
            Resolved::File(output) => Body::File { output, pos: 0 },
            Resolved::Dir(entries) => Body::Dir { entries, pos: 0 },
        };
        Ok(Handle { path: full, body })
    }

    /// Stat a path.
    pub async fn stat(&self, requested: &str) -> VfsResult<FileAttr> {
        let full = path::clean(requested);
        if path::is_root(&full) {
            return Ok(FileAttr::directory(0o755));
        }
        // Unregistered roots can stat through the real side without forcing
        // a full read.
        if let Some(real) = &self.real {
            let root_seg = path::first_segment(&full).expect("non-root path");
            if !self.index.read().has_root(root_seg) {
                return real.stat(&full).await;
            }
        }
        match self.resolve(&full).await? {
            Resolved::File(output) => Ok(output.attr()),
            Resolved::Dir(_) => Ok(FileAttr::directory(0o755)),
        }
    }

    /// Read a full directory listing.
    pub async fn read_dir(&self, requested: &str) -> VfsResult<Vec<DirEntry>> {
        let mut handle = self.open(requested).await?;
        handle.read_dir(0)
    }

    /// Read a file's full contents.
    pub async fn read_file(&self, requested: &str) -> VfsResult<Vec<u8>> {
        let full = path::clean(requested);
        match self.resolve(&full).await? {
            Resolved::File(output) => Ok(output.data.clone()),
            Resolved::Dir(_) => Err(VfsError::invalid_op(full, "is a directory")),
        }
    }

    /// Check that every path exists, concurrently.
    ///
    /// All failures are joined into one error rather than short-circuiting
    /// on the first, so a caller sees every missing dependency at once.
    pub async fn exists_all<S: AsRef<str>>(&self, paths: &[S]) -> VfsResult<()> {
        let checks = paths.iter().map(|p| self.stat(p.as_ref()));
        let failures: Vec<VfsError> = join_all(checks)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(VfsError::aggregate(failures))
        }
    }

    // ========================================================================
    // Invalidation and notification
    // ========================================================================

    /// Drop memoized results for exactly the given paths. Returns how many
    /// entries were removed. Subsequent resolutions recompute.
    pub fn invalidate<I, S>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut removed = 0;
        for p in paths {
            let p = path::clean(&p.into());
            if self.files.invalidate(&p) {
                removed += 1;
            }
            if self.dirs.invalidate(&p) {
                removed += 1;
            }
        }
        removed
    }

    /// Subscribe to change notifications for a generated path.
    ///
    /// Fails if the path cannot currently be resolved.
    pub async fn subscribe(&self, requested: &str) -> VfsResult<Subscription> {
        let full = path::clean(requested);
        self.stat(&full).await?;
        Ok(self.bus.subscribe([full]))
    }

    /// Report an external change at a concrete source path.
    ///
    /// Matches the path against registered watch patterns (literal matches
    /// first), walks the reverse dependency closure, and publishes one event
    /// per affected generated path. Returns the affected paths, nearest
    /// dependents first. Memoized entries are *not* invalidated here; that
    /// is the subscriber's explicit call.
    pub fn trigger(&self, source_path: &str, changes: ChangeSet) -> Vec<String> {
        let source = path::clean(source_path);
        let mut affected: Vec<String> = Vec::new();
        for pattern in self.graph.match_patterns(&source) {
            for node in self.graph.deep_ins(&pattern, changes) {
                if !affected.contains(&node) {
                    affected.push(node);
                }
            }
        }
        tracing::debug!(source = %source, affected = affected.len(), "change fan-out");
        for p in &affected {
            self.bus.publish(ChangeEvent {
                path: p.clone(),
                changes,
            });
        }
        affected
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn resolve(&self, full: &str) -> VfsResult<Resolved> {
        if path::is_root(full) {
            return Ok(Resolved::Dir(self.root_listing().await?));
        }
        let root_seg = path::first_segment(full).expect("non-root path");
        if !self.index.read().has_root(root_seg) {
            return self.resolve_real(full).await;
        }
        self.resolve_virtual(full).await
    }

    /// Merge the synthesized virtual root with the real root listing.
    async fn root_listing(&self) -> VfsResult<Vec<DirEntry>> {
        let virtual_entries = {
            let index = self.index.read();
            index
                .children_of(".")
                .map(|children| synth::entries_from_children(&children))
                .unwrap_or_default()
        };
        let real_entries = match &self.real {
            Some(real) => real.read_dir(".").await?,
            None => Vec::new(),
        };
        Ok(synth::merge_entries(virtual_entries, real_entries))
    }

    async fn resolve_real(&self, full: &str) -> VfsResult<Resolved> {
        let Some(real) = &self.real else {
            return Err(VfsError::not_exist(full));
        };
        let attr = real.stat(full).await?;
        if attr.is_dir() {
            Ok(Resolved::Dir(real.read_dir(full).await?))
        } else {
            let data = real.read(full).await?;
            Ok(Resolved::File(Arc::new(
                FileOutput::new(data)
                    .with_perm(attr.perm)
                    .with_mtime(attr.mtime),
            )))
        }
    }

    /// Walk the path through the generator namespace.
    ///
    /// `scope` is the index being resolved against (`None` means the
    /// top-level index), `base` its absolute path, and `rel` the remainder
    /// of the request within it.
    async fn resolve_virtual(&self, full: &str) -> VfsResult<Resolved> {
        let mut scope: Option<Arc<DirSpec>> = None;
        let mut base = ".".to_string();
        let mut rel = full.to_string();

        loop {
            let hit = match &scope {
                None => Self::lookup(&self.index.read(), &rel),
                Some(spec) => Self::lookup(&spec.index, &rel),
            };

            match hit {
                Hit::Exact(Generator::File(f)) => {
                    let output = self
                        .files
                        .get_or_compute(full, || async {
                            f(full.to_string())
                                .await
                                .map(Arc::new)
                                .map_err(|e| VfsError::generator(full, e))
                        })
                        .await?;
                    return Ok(Resolved::File(output));
                }

                Hit::Exact(Generator::Serve(s)) => {
                    // The serve callback owns its whole namespace, including
                    // the registered path itself. Never memoized.
                    let data = s(full.to_string(), ".".to_string())
                        .await
                        .map_err(|e| VfsError::generator(full, e))?;
                    return Ok(Resolved::File(Arc::new(FileOutput::new(data))));
                }

                Hit::Exact(Generator::Dir(f)) => {
                    let spec = self.load_dir(full, &f).await?;
                    let own = spec
                        .index
                        .children_of(".")
                        .map(|children| synth::entries_from_children(&children))
                        .unwrap_or_default();
                    let listing = synth::merge_entries(own, spec.entries.clone());
                    // Flat registrations in the enclosing scope that pass
                    // through this directory are part of its listing too.
                    let outer = match &scope {
                        None => self.index.read().children_of(&rel),
                        Some(spec) => spec.index.children_of(&rel),
                    }
                    .map(|children| synth::entries_from_children(&children))
                    .unwrap_or_default();
                    return Ok(Resolved::Dir(synth::merge_entries(listing, outer)));
                }

                Hit::Prefix {
                    matched,
                    generator: Generator::Dir(f),
                } => {
                    let abs = path::join(&base, &matched);
                    let spec = self.load_dir(&abs, &f).await?;
                    let remainder = path::strip_prefix(&rel, &matched)
                        .expect("prefix came from this path")
                        .to_string();
                    scope = Some(spec);
                    base = abs;
                    rel = remainder;
                }

                Hit::Prefix {
                    matched,
                    generator: Generator::Serve(s),
                } => {
                    let serve_rel = path::strip_prefix(&rel, &matched)
                        .expect("prefix came from this path")
                        .to_string();
                    let data = s(full.to_string(), serve_rel)
                        .await
                        .map_err(|e| VfsError::generator(full, e))?;
                    return Ok(Resolved::File(Arc::new(FileOutput::new(data))));
                }

                Hit::Prefix {
                    generator: Generator::File(_),
                    ..
                } => {
                    // The namespace below a file is empty.
                    return Err(VfsError::not_exist(full));
                }

                Hit::Synthesize(children) => {
                    let entries = children
                        .map(|children| synth::entries_from_children(&children))
                        .unwrap_or_default();
                    if entries.is_empty() {
                        return Err(VfsError::not_exist(full));
                    }
                    return Ok(Resolved::Dir(entries));
                }
            }
        }
    }

    fn lookup(index: &PathIndex, rel: &str) -> Hit {
        if let Some(generator) = index.get(rel) {
            return Hit::Exact(generator.clone());
        }
        if let Some((matched, generator)) = index.get_by_prefix(rel) {
            return Hit::Prefix {
                matched,
                generator: generator.clone(),
            };
        }
        Hit::Synthesize(index.children_of(rel))
    }

    /// Run a directory generator (memoized per absolute path) and record
    /// its watch declarations as dependency edges.
    async fn load_dir(&self, abs: &str, f: &DirFn) -> VfsResult<Arc<DirSpec>> {
        self.dirs
            .get_or_compute(abs, || async {
                let filled = f(DirBuilder::new(abs))
                    .await
                    .map_err(|e| VfsError::generator(abs, e))?;
                let spec = Arc::new(filled.freeze());
                for (pattern, changes) in &spec.watches {
                    self.graph.link(abs, pattern, *changes);
                }
                Ok(spec)
            })
            .await
    }
}

enum Hit {
    Exact(Generator),
    Prefix { matched: String, generator: Generator },
    Synthesize(Option<Vec<crate::index::ChildSummary>>),
}

impl std::fmt::Debug for GenFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenFs")
            .field("index", &"<locked>")
            .field("files", &self.files)
            .field("dirs", &self.dirs)
            .field("graph", &self.graph)
            .field("real", &self.real.is_some())
            .finish()
    }
}

// ============================================================================
// Handle
// ============================================================================

enum Body {
    File { output: Arc<FileOutput>, pos: usize },
    Dir { entries: Vec<DirEntry>, pos: usize },
}

/// An open file or directory.
///
/// [`Handle::path`] is the originally requested path, so generator content
/// that echoes it back sees the caller's view.
pub struct Handle {
    path: String,
    body: Body,
}

impl Handle {
    /// The originally requested (normalized) path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attributes of the open entry.
    pub fn stat(&self) -> FileAttr {
        match &self.body {
            Body::File { output, .. } => output.attr(),
            Body::Dir { .. } => FileAttr::directory(0o755),
        }
    }

    /// True if this handle is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.body, Body::Dir { .. })
    }

    /// Read file bytes into `buf`, advancing the cursor. Returns 0 at EOF.
    pub fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        match &mut self.body {
            Body::File { output, pos } => {
                let data = &output.data;
                if *pos >= data.len() {
                    return Ok(0);
                }
                let n = buf.len().min(data.len() - *pos);
                buf[..n].copy_from_slice(&data[*pos..*pos + n]);
                *pos += n;
                Ok(n)
            }
            Body::Dir { .. } => Err(VfsError::invalid_op(self.path.clone(), "is a directory")),
        }
    }

    /// Read directory entries, advancing the cursor.
    ///
    /// `n == 0` returns all remaining entries (possibly none); `n > 0`
    /// returns up to `n` entries and [`VfsError::Eof`] once exhausted.
    pub fn read_dir(&mut self, n: usize) -> VfsResult<Vec<DirEntry>> {
        match &mut self.body {
            Body::Dir { entries, pos } => {
                if n == 0 {
                    let rest = entries[*pos..].to_vec();
                    *pos = entries.len();
                    return Ok(rest);
                }
                if *pos >= entries.len() {
                    return Err(VfsError::Eof);
                }
                let end = (*pos + n).min(entries.len());
                let chunk = entries[*pos..end].to_vec();
                *pos = end;
                Ok(chunk)
            }
            Body::File { .. } => Err(VfsError::invalid_op(self.path.clone(), "not a directory")),
        }
    }

    /// Move the file cursor. Seeking past the end is invalid.
    pub fn seek(&mut self, to: u64) -> VfsResult<u64> {
        match &mut self.body {
            Body::File { output, pos } => {
                if to > output.data.len() as u64 {
                    return Err(VfsError::invalid_op(self.path.clone(), "seek past end"));
                }
                *pos = to as usize;
                Ok(to)
            }
            Body::Dir { .. } => Err(VfsError::invalid_op(self.path.clone(), "is a directory")),
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.body {
            Body::File { .. } => FileType::File,
            Body::Dir { .. } => FileType::Directory,
        };
        f.debug_struct("Handle")
            .field("path", &self.path)
            .field("kind", &kind)
            .finish()
    }
}
