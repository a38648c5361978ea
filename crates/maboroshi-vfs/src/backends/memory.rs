//! In-memory backend.
//!
//! A fixed file tree built up front, used for tests and for overlaying
//! pre-rendered assets without touching disk. Directories are implicit:
//! any path with files below it stats as a directory.

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::backends::RealFs;
use crate::error::{VfsError, VfsResult};
use crate::path;
use crate::types::{DirEntry, FileAttr, FileType};

/// In-memory read-only file tree.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFs {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating implicit parent directories. Builder-style.
    pub fn with_file(mut self, p: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(p, data);
        self
    }

    /// Add a file in place.
    pub fn insert(&mut self, p: &str, data: impl Into<Vec<u8>>) {
        self.files.insert(path::clean(p), data.into());
    }

    fn is_dir(&self, p: &str) -> bool {
        path::is_root(p) || self.files.keys().any(|k| path::is_within(k, p) && k != p)
    }
}

#[async_trait]
impl RealFs for MemoryFs {
    async fn stat(&self, p: &str) -> VfsResult<FileAttr> {
        let p = path::clean(p);
        if let Some(data) = self.files.get(&p) {
            return Ok(FileAttr::file(data.len() as u64, 0o644));
        }
        if self.is_dir(&p) {
            return Ok(FileAttr::directory(0o755));
        }
        Err(VfsError::not_exist(p))
    }

    async fn read_dir(&self, p: &str) -> VfsResult<Vec<DirEntry>> {
        let p = path::clean(p);
        if self.files.contains_key(&p) {
            return Err(VfsError::invalid_op(p, "not a directory"));
        }
        if !self.is_dir(&p) {
            return Err(VfsError::not_exist(p));
        }

        let mut names: BTreeSet<(String, FileType)> = BTreeSet::new();
        for key in self.files.keys() {
            let Some(rest) = path::strip_prefix(key, &p) else {
                continue;
            };
            match rest.split_once('/') {
                None => {
                    names.insert((rest.to_string(), FileType::File));
                }
                Some((first, _)) => {
                    names.insert((first.to_string(), FileType::Directory));
                }
            }
        }

        Ok(names
            .into_iter()
            .map(|(name, kind)| {
                let size = if kind.is_file() {
                    self.files
                        .get(&path::join(&p, &name))
                        .map(|d| d.len() as u64)
                        .unwrap_or(0)
                } else {
                    0
                };
                DirEntry::new(name, kind)
                    .with_size(size)
                    .with_mtime(SystemTime::UNIX_EPOCH)
            })
            .collect())
    }

    async fn read(&self, p: &str) -> VfsResult<Vec<u8>> {
        let p = path::clean(p);
        match self.files.get(&p) {
            Some(data) => Ok(data.clone()),
            None if self.is_dir(&p) => Err(VfsError::invalid_op(p, "is a directory")),
            None => Err(VfsError::not_exist(p)),
        }
    }
}
