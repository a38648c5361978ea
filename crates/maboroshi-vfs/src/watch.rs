//! Source watcher bridge.
//!
//! Watches a real directory tree and feeds change events into
//! [`GenFs::trigger`]: the OS event's kind becomes a [`ChangeSet`] and its
//! absolute path is relativized against the watch root, since trigger and
//! the dependency graph speak normalized relative paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{VfsError, VfsResult};
use crate::fs::GenFs;
use crate::types::ChangeSet;

/// Map an OS watcher event kind to a change mask. Access-only and other
/// noise events map to `None` and are ignored.
fn change_set(kind: &EventKind) -> Option<ChangeSet> {
    match kind {
        EventKind::Create(_) => Some(ChangeSet::CREATE),
        EventKind::Modify(_) => Some(ChangeSet::WRITE),
        EventKind::Remove(_) => Some(ChangeSet::REMOVE),
        _ => None,
    }
}

/// Relativize an absolute event path against the watch root.
fn relativize(root: &Path, abs: &Path) -> Option<String> {
    let rel = abs.strip_prefix(root).ok()?;
    let rel = rel.to_string_lossy();
    if rel.is_empty() {
        return None;
    }
    Some(crate::path::clean(&rel))
}

/// Recursive watcher over a source root, driving a [`GenFs`]'s trigger.
///
/// Dropping the watcher stops both the OS watch and the forwarding task.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl SourceWatcher {
    /// Watch `root` recursively, forwarding each relevant change to
    /// `fs.trigger`.
    pub fn spawn(fs: Arc<GenFs>, root: impl Into<PathBuf>) -> VfsResult<Self> {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);

        // Bounded and try_send: a burst of events must never block the
        // notify callback thread.
        let (tx, mut rx) = mpsc::channel::<(String, ChangeSet)>(256);

        let event_root = root.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                let Some(changes) = change_set(&event.kind) else {
                    return;
                };
                for abs in &event.paths {
                    if let Some(rel) = relativize(&event_root, abs) {
                        let _ = tx.try_send((rel, changes));
                    }
                }
            })
            .map_err(|e| VfsError::other(format!("watcher setup: {}", e)))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| VfsError::other(format!("watch {}: {}", root.display(), e)))?;

        let task = tokio::spawn(async move {
            while let Some((source, changes)) = rx.recv().await {
                fs.trigger(&source, changes);
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for SourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWatcher").finish_non_exhaustive()
    }
}
