//! Generator variants and the directory registration surface.
//!
//! A [`Generator`] is a registered callback that produces file or directory
//! content on demand. The three shapes are a closed sum so resolution can
//! match exhaustively:
//!
//! - [`Generator::File`] - produces one file's bytes for its exact path
//! - [`Generator::Dir`] - fills a [`DirBuilder`] with nested registrations,
//!   declared entries, and watch declarations
//! - [`Generator::Serve`] - produces bytes for *any* path under its prefix;
//!   the set of valid paths is unbounded and never enumerable

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use futures::future::BoxFuture;

use crate::error::VfsResult;
use crate::index::PathIndex;
use crate::path;
use crate::types::{ChangeSet, DirEntry, FileAttr, FileType};

/// Boxed file generator callback. Receives the originally requested path.
pub type FileFn = Arc<dyn Fn(String) -> BoxFuture<'static, VfsResult<FileOutput>> + Send + Sync>;

/// Boxed directory generator callback. Receives an empty [`DirBuilder`]
/// scoped to the directory and returns it filled.
pub type DirFn =
    Arc<dyn Fn(DirBuilder) -> BoxFuture<'static, VfsResult<DirBuilder>> + Send + Sync>;

/// Boxed serve callback. Receives the originally requested path and the
/// path relative to the serve prefix.
pub type ServeFn =
    Arc<dyn Fn(String, String) -> BoxFuture<'static, VfsResult<Vec<u8>>> + Send + Sync>;

/// The three generator shapes.
#[derive(Clone)]
pub enum Generator {
    /// Produces the full content of a single file.
    File(FileFn),
    /// Produces a subtree of nested registrations.
    Dir(DirFn),
    /// Produces file content for an unbounded set of paths under a prefix.
    Serve(ServeFn),
}

/// Shape tag for a [`Generator`], used when synthesizing listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    File,
    Dir,
    Serve,
}

impl Generator {
    /// Wrap an async closure as a file generator.
    ///
    /// The closure receives the requested path and must be idempotent
    /// across repeated calls until the path is invalidated.
    pub fn file<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VfsResult<FileOutput>> + Send + 'static,
    {
        Self::File(Arc::new(move |path| Box::pin(f(path))))
    }

    /// Wrap an async closure as a directory generator.
    ///
    /// The closure takes ownership of the builder, registers children and
    /// watches on it, and returns it.
    pub fn dir<F, Fut>(f: F) -> Self
    where
        F: Fn(DirBuilder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VfsResult<DirBuilder>> + Send + 'static,
    {
        Self::Dir(Arc::new(move |builder| Box::pin(f(builder))))
    }

    /// Wrap an async closure as a serve generator.
    ///
    /// The closure receives `(requested_path, relative_path)` and is invoked
    /// for every distinct path under the registered prefix; results are
    /// never memoized.
    pub fn serve<F, Fut>(f: F) -> Self
    where
        F: Fn(String, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VfsResult<Vec<u8>>> + Send + 'static,
    {
        Self::Serve(Arc::new(move |path, rel| Box::pin(f(path, rel))))
    }

    /// The shape of this generator.
    pub fn kind(&self) -> GeneratorKind {
        match self {
            Self::File(_) => GeneratorKind::File,
            Self::Dir(_) => GeneratorKind::Dir,
            Self::Serve(_) => GeneratorKind::Serve,
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(_) => f.write_str("Generator::File(<fn>)"),
            Self::Dir(_) => f.write_str("Generator::Dir(<fn>)"),
            Self::Serve(_) => f.write_str("Generator::Serve(<fn>)"),
        }
    }
}

/// Output of a file generator.
#[derive(Debug, Clone)]
pub struct FileOutput {
    /// File contents.
    pub data: Vec<u8>,
    /// Unix permissions.
    pub perm: u32,
    /// Modification time.
    pub mtime: SystemTime,
}

impl FileOutput {
    /// Create output with default permissions (0o644) and epoch mtime.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            perm: 0o644,
            mtime: SystemTime::UNIX_EPOCH,
        }
    }

    /// Set the permissions.
    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = perm;
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = mtime;
        self
    }

    /// Attributes for this output.
    pub fn attr(&self) -> FileAttr {
        FileAttr {
            size: self.data.len() as u64,
            kind: FileType::File,
            perm: self.perm,
            mtime: self.mtime,
        }
    }
}

/// The registration surface handed to a directory generator.
///
/// All paths are relative to the directory being generated. Registrations
/// go into a fresh, directory-scoped index; watch declarations describe
/// which external source changes affect this directory's output.
pub struct DirBuilder {
    path: String,
    index: PathIndex,
    entries: Vec<DirEntry>,
    watches: Vec<(String, ChangeSet)>,
}

impl DirBuilder {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            index: PathIndex::new(),
            entries: Vec::new(),
            watches: Vec::new(),
        }
    }

    /// The caller-view path of the directory being generated.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Register a generator at `rel`. First write wins; returns whether the
    /// registration was inserted.
    pub fn add(&mut self, rel: &str, generator: Generator) -> bool {
        self.index.set(&path::clean(rel), generator)
    }

    /// Register a file generator at `rel`.
    pub fn generate_file<F, Fut>(&mut self, rel: &str, f: F) -> bool
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VfsResult<FileOutput>> + Send + 'static,
    {
        self.add(rel, Generator::file(f))
    }

    /// Register a nested directory generator at `rel`.
    pub fn generate_dir<F, Fut>(&mut self, rel: &str, f: F) -> bool
    where
        F: Fn(DirBuilder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VfsResult<DirBuilder>> + Send + 'static,
    {
        self.add(rel, Generator::dir(f))
    }

    /// Register a serve generator at `rel`.
    pub fn serve<F, Fut>(&mut self, rel: &str, f: F) -> bool
    where
        F: Fn(String, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VfsResult<Vec<u8>>> + Send + 'static,
    {
        self.add(rel, Generator::serve(f))
    }

    /// Declare a listing entry for this directory without backing it with a
    /// generator. Registration-derived entries win on name collision.
    pub fn entry(&mut self, entry: DirEntry) {
        self.entries.push(entry);
    }

    /// Declare that this directory's output depends on sources matching
    /// `pattern` for the given change kinds.
    pub fn watch(&mut self, pattern: impl Into<String>, changes: ChangeSet) {
        self.watches.push((pattern.into(), changes));
    }

    pub(crate) fn freeze(self) -> DirSpec {
        DirSpec {
            index: self.index,
            entries: self.entries,
            watches: self.watches,
        }
    }
}

impl std::fmt::Debug for DirBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirBuilder")
            .field("path", &self.path)
            .field("registrations", &self.index.len())
            .field("entries", &self.entries.len())
            .field("watches", &self.watches.len())
            .finish()
    }
}

/// A directory generator's frozen result: its scoped index, declared
/// entries, and watch declarations. Immutable once built, so resolution can
/// share it across threads without locking.
#[derive(Debug)]
pub(crate) struct DirSpec {
    pub(crate) index: PathIndex,
    pub(crate) entries: Vec<DirEntry>,
    pub(crate) watches: Vec<(String, ChangeSet)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_generator_invocation() {
        let generator = Generator::file(|path| async move {
            Ok(FileOutput::new(format!("content of {}", path).into_bytes()))
        });

        let Generator::File(f) = &generator else {
            panic!("wrong shape");
        };
        let out = f("gen/main.go".to_string()).await.unwrap();
        assert_eq!(out.data, b"content of gen/main.go");
        assert_eq!(out.attr().size, 22);
    }

    #[tokio::test]
    async fn test_dir_builder_registrations() {
        let generator = Generator::dir(|mut dir| async move {
            dir.generate_file("index.html", |_| async {
                Ok(FileOutput::new(b"<h1>hi</h1>".to_vec()))
            });
            dir.watch("view/*.svelte", ChangeSet::WRITE);
            dir.entry(DirEntry::directory("assets"));
            Ok(dir)
        });

        let Generator::Dir(f) = &generator else {
            panic!("wrong shape");
        };
        let spec = f(DirBuilder::new("site")).await.unwrap().freeze();
        assert_eq!(spec.index.len(), 1);
        assert!(spec.index.get("index.html").is_some());
        assert_eq!(spec.watches, vec![("view/*.svelte".to_string(), ChangeSet::WRITE)]);
        assert_eq!(spec.entries.len(), 1);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut dir = DirBuilder::new("site");
        assert!(dir.generate_file("a.txt", |_| async { Ok(FileOutput::new(b"one".to_vec())) }));
        assert!(!dir.generate_file("a.txt", |_| async { Ok(FileOutput::new(b"two".to_vec())) }));
        assert_eq!(dir.index.len(), 1);
    }

    #[test]
    fn test_generator_kind() {
        let file = Generator::file(|_| async { Ok(FileOutput::new(Vec::new())) });
        let dir = Generator::dir(|d| async move { Ok(d) });
        let serve = Generator::serve(|_, _| async { Ok(Vec::new()) });
        assert_eq!(file.kind(), GeneratorKind::File);
        assert_eq!(dir.kind(), GeneratorKind::Dir);
        assert_eq!(serve.kind(), GeneratorKind::Serve);
    }
}
