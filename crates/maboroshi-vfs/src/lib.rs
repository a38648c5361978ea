//! # maboroshi-vfs
//!
//! Generator-backed virtual filesystem: a read-only `fs`-like surface whose
//! entries are computed on demand by registered generator callbacks,
//! transparently merged with an optional real on-disk tree.
//!
//! Key components:
//!
//! - [`GenFs`] - the front door: `open`/`stat`/`read_dir`, registration,
//!   invalidation, subscription, and change triggering
//! - [`Generator`] - the three generator shapes (file, directory, serve)
//! - [`PathIndex`] - segment trie with longest-prefix resolution
//! - [`DepGraph`] - generated-path → source-pattern dependency edges with
//!   transitive reverse queries
//! - [`EventBus`] - lossy fan-out of stale-path notifications
//! - [`DiskFs`] / [`MemoryFs`] - real-filesystem backends for the merge
//!
//! ## Design decisions
//!
//! - **Paths are normalized relative strings**: `"."` is the root; the same
//!   key addresses registrations, memo entries, graph nodes, and bus topics.
//! - **First registration wins**: re-registering a path is a no-op, which
//!   makes incremental [`GenFs::add`] calls idempotent.
//! - **Results are memoized, errors included**: a generator runs at most
//!   once per path until explicitly invalidated, no matter how many
//!   concurrent readers ask. Serve resolutions are the exception: their
//!   namespace is unbounded, so they recompute per request.
//! - **No cancellation**: a caller racing a resolution against a timeout
//!   must treat a late completion as fire-and-forget; the memo still caches
//!   it for the next reader.

pub mod backends;
pub mod path;

mod bus;
mod cache;
mod error;
mod fs;
mod generator;
mod graph;
mod index;
mod synth;
mod types;
mod watch;

pub use backends::{DiskFs, MemoryFs, RealFs};
pub use bus::{EventBus, Subscription};
pub use error::{VfsError, VfsResult};
pub use fs::{GenFs, Handle};
pub use generator::{DirBuilder, DirFn, FileFn, FileOutput, Generator, GeneratorKind, ServeFn};
pub use graph::DepGraph;
pub use index::{ChildSummary, PathIndex};
pub use types::{ChangeEvent, ChangeSet, DirEntry, FileAttr, FileType};
pub use watch::SourceWatcher;
