//! On-disk backend.
//!
//! Rooted at a real directory, with path security: a request can never
//! resolve outside the root, even through `..` or symlinks.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;

use crate::backends::RealFs;
use crate::error::{VfsError, VfsResult};
use crate::path;
use crate::types::{DirEntry, FileAttr, FileType};

/// Read-only view of a real directory tree.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    /// Create a disk backend rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// Existing paths are canonicalized so symlinks cannot escape; the
    /// normalized relative form already resolved any `..`.
    fn resolve(&self, rel: &str) -> VfsResult<PathBuf> {
        let rel = path::clean(rel);
        if path::is_root(&rel) {
            return Ok(self.root.clone());
        }
        let full = self.root.join(&rel);
        let resolved = full.canonicalize().unwrap_or(full);
        if !resolved.starts_with(&self.root) {
            return Err(VfsError::invalid_op(rel, "path escapes root"));
        }
        Ok(resolved)
    }

    fn map_io(rel: &str, e: io::Error) -> VfsError {
        if e.kind() == io::ErrorKind::NotFound {
            VfsError::not_exist(rel)
        } else {
            VfsError::from(e)
        }
    }

    fn metadata_to_attr(meta: &std::fs::Metadata) -> FileAttr {
        let kind = if meta.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        };
        FileAttr {
            size: if kind.is_dir() { 0 } else { meta.len() },
            kind,
            perm: meta.permissions().mode() & 0o777,
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }
}

#[async_trait]
impl RealFs for DiskFs {
    async fn stat(&self, rel: &str) -> VfsResult<FileAttr> {
        let full = self.resolve(rel)?;
        let meta = fs::metadata(&full).await.map_err(|e| Self::map_io(rel, e))?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn read_dir(&self, rel: &str) -> VfsResult<Vec<DirEntry>> {
        let full = self.resolve(rel)?;
        let mut dir = fs::read_dir(&full).await.map_err(|e| Self::map_io(rel, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| Self::map_io(rel, e))? {
            let meta = entry.metadata().await.map_err(|e| Self::map_io(rel, e))?;
            let attr = Self::metadata_to_attr(&meta);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: attr.kind,
                size: attr.size,
                perm: attr.perm,
                mtime: attr.mtime,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, rel: &str) -> VfsResult<Vec<u8>> {
        let full = self.resolve(rel)?;
        let meta = fs::metadata(&full).await.map_err(|e| Self::map_io(rel, e))?;
        if meta.is_dir() {
            return Err(VfsError::invalid_op(rel, "is a directory"));
        }
        fs::read(&full).await.map_err(|e| Self::map_io(rel, e))
    }
}
