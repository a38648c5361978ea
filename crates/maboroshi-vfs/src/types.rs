//! Core value types.
//!
//! These types are path-based and serializable so they can cross an RPC
//! or dev-server boundary unchanged.

use std::time::SystemTime;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Entry type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// Entry type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
    /// Last modification time. Synthesized directories report the epoch so
    /// repeated stats of the same virtual path are identical.
    pub mtime: SystemTime,
}

impl FileAttr {
    /// Create attributes for a file.
    pub fn file(size: u64, perm: u32) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm,
            mtime: SystemTime::UNIX_EPOCH,
        }
    }

    /// Create attributes for a directory.
    pub fn directory(perm: u32) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm,
            mtime: SystemTime::UNIX_EPOCH,
        }
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = mtime;
        self
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
///
/// Synthesized listings carry deterministic metadata: entries derived from
/// registrations that have not run yet report size 0 and epoch mtime, so two
/// listings of the same directory are byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
    /// Size in bytes, when known.
    pub size: u64,
    /// Unix permissions.
    pub perm: u32,
    /// Modification time, when known.
    pub mtime: SystemTime,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        let perm = match kind {
            FileType::File => 0o644,
            FileType::Directory => 0o755,
        };
        Self {
            name: name.into(),
            kind,
            size: 0,
            perm,
            mtime: SystemTime::UNIX_EPOCH,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = mtime;
        self
    }

    /// Entry attributes as a [`FileAttr`].
    pub fn attr(&self) -> FileAttr {
        FileAttr {
            size: self.size,
            kind: self.kind,
            perm: self.perm,
            mtime: self.mtime,
        }
    }

    /// Returns true if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

bitflags! {
    /// Kinds of change a watched source can undergo.
    ///
    /// Watch declarations and dependency edges carry a mask of these;
    /// repeated links OR their masks together.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeSet: u8 {
        /// A matching path was created.
        const CREATE = 1 << 0;
        /// A matching path's contents were modified.
        const WRITE = 1 << 1;
        /// A matching path was removed.
        const REMOVE = 1 << 2;
    }
}

/// Event delivered to subscribers when a generated path is affected by a
/// source change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// The generated path that is now stale.
    pub path: String,
    /// What happened to the watched source.
    pub changes: ChangeSet,
}
