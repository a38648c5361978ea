//! Error types for the virtual filesystem.
//!
//! Errors are `Clone` because the memoizer caches failed generator runs:
//! every caller of an already-failed path observes the same error without
//! the generator being re-invoked.

use std::io;
use thiserror::Error;

/// Virtual filesystem error type.
#[derive(Debug, Clone, Error)]
pub enum VfsError {
    /// No generator or real file resolves the path.
    #[error("does not exist: {0}")]
    NotExist(String),

    /// Structurally valid path, unsupported operation (e.g. listing a
    /// serve-owned path, reading a directory, seeking past bounds).
    #[error("invalid operation on {path}: {reason}")]
    InvalidOp { path: String, reason: String },

    /// A generator callback failed while resolving `path`. The source is
    /// preserved so chained failures stay diagnosable and existence checks
    /// can still see a nested `NotExist`.
    #[error("generating {path}: {source}")]
    Generator {
        path: String,
        #[source]
        source: Box<VfsError>,
    },

    /// Multiple independent path checks failed; all failures are joined
    /// rather than short-circuited on the first.
    #[error("{}", join_failures(.0))]
    Aggregate(Vec<VfsError>),

    /// Directory cursor exhausted (bounded `read_dir` only).
    #[error("end of directory")]
    Eof,

    /// Underlying I/O error, stringified. `io::ErrorKind::NotFound` is
    /// canonicalized to [`VfsError::NotExist`] before it gets here.
    #[error("I/O error: {0}")]
    Io(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    /// Create a NotExist error.
    pub fn not_exist(path: impl Into<String>) -> Self {
        Self::NotExist(path.into())
    }

    /// Create an InvalidOp error.
    pub fn invalid_op(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOp {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a generator failure with the path under resolution.
    ///
    /// The source error is kept, not discarded, so a nested `NotExist` is
    /// still visible to [`VfsError::is_not_exist`] through the wrap.
    pub fn generator(path: impl Into<String>, source: VfsError) -> Self {
        Self::Generator {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Join failures from independent checks into one error.
    ///
    /// A single failure is returned as itself.
    pub fn aggregate(mut failures: Vec<VfsError>) -> Self {
        if failures.len() == 1 {
            failures.remove(0)
        } else {
            Self::Aggregate(failures)
        }
    }

    /// True if this error means "the path does not exist", unwrapping
    /// through generator and aggregate layers.
    pub fn is_not_exist(&self) -> bool {
        match self {
            Self::NotExist(_) => true,
            Self::Generator { source, .. } => source.is_not_exist(),
            Self::Aggregate(errs) => errs.iter().all(|e| e.is_not_exist()),
            _ => false,
        }
    }

    /// True for invalid-operation errors.
    pub fn is_invalid_op(&self) -> bool {
        matches!(self, Self::InvalidOp { .. })
    }
}

impl From<io::Error> for VfsError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            Self::NotExist(e.to_string())
        } else {
            Self::Io(e.to_string())
        }
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match &e {
            VfsError::NotExist(_) => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            VfsError::InvalidOp { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
            }
            VfsError::Eof => io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string()),
            _ => io::Error::other(e.to_string()),
        }
    }
}

fn join_failures(failures: &[VfsError]) -> String {
    let joined = failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} failures: {}", failures.len(), joined)
}

/// Virtual filesystem result type.
pub type VfsResult<T> = Result<T, VfsError>;
