//! Real-filesystem backends.
//!
//! The virtual filesystem treats the on-disk side of the merge as an
//! external collaborator behind the [`RealFs`] contract: open bytes by
//! path, stat metadata, list a directory. Read-only by policy: this core
//! never writes through it.

mod disk;
mod memory;

use async_trait::async_trait;

pub use disk::DiskFs;
pub use memory::MemoryFs;

use crate::error::VfsResult;
use crate::types::{DirEntry, FileAttr};

/// Read-only real-filesystem contract.
///
/// Paths are normalized slash-separated relative paths; `"."` is the
/// backend's root. Implementations translate their own "not found" into
/// [`crate::VfsError::NotExist`] and pass other errors through unchanged.
#[async_trait]
pub trait RealFs: Send + Sync {
    /// Get metadata for a file or directory.
    async fn stat(&self, path: &str) -> VfsResult<FileAttr>;

    /// List a directory, sorted by name.
    async fn read_dir(&self, path: &str) -> VfsResult<Vec<DirEntry>>;

    /// Read the entire contents of a file.
    async fn read(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Check if a path exists.
    async fn exists(&self, path: &str) -> bool {
        self.stat(path).await.is_ok()
    }
}
