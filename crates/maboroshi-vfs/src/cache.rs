//! Per-path memoization of generator results.
//!
//! The first caller to resolve a not-yet-cached path runs the computation;
//! concurrent callers for the same path wait on the same cell and observe
//! the same result. Failed runs are cached too: a generator that fails is
//! not retried on every read, only after explicit invalidation. Unrelated
//! paths never contend.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::{VfsError, VfsResult};

type Cell<V> = Arc<OnceCell<Result<V, VfsError>>>;

/// Path-keyed memoizer with at-most-once computation per path.
pub(crate) struct Memo<V: Clone> {
    cells: DashMap<String, Cell<V>>,
}

impl<V: Clone> Memo<V> {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// Return the cached result for `path`, computing it with `compute` if
    /// absent. Concurrent callers for the same path block until the single
    /// in-flight computation finishes.
    pub async fn get_or_compute<F, Fut>(&self, path: &str, compute: F) -> VfsResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = VfsResult<V>>,
    {
        let cell = self
            .cells
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        // get_or_init never re-runs once the cell holds a value, and the
        // value here is the whole Result, so errors are memoized alongside
        // successes.
        cell.get_or_init(|| async { compute().await }).await.clone()
    }

    /// Drop the cached result for exactly `path`. Returns true if an entry
    /// was removed. The next resolution recomputes.
    pub fn invalidate(&self, path: &str) -> bool {
        self.cells.remove(path).is_some()
    }

    /// Number of cached paths (including in-flight computations).
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

impl<V: Clone> std::fmt::Debug for Memo<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("cached", &self.cells.len())
            .finish()
    }
}
