//! Errors raised by the object store and tree builder

use crate::hash::Digest;
use crate::object::{ObjectKind, RecordError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    ObjectNotFound(Digest),

    #[error("object {digest} is a {actual}, expected a {expected}")]
    ObjectKindMismatch {
        digest: Digest,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("failed to write object {digest}: {source}")]
    StoreWriteError {
        digest: Digest,
        #[source]
        source: io::Error,
    },

    #[error("corrupt object {digest}: {source}")]
    CorruptObject {
        digest: Digest,
        #[source]
        source: RecordError,
    },

    #[error("cannot encode object: {0}")]
    Unencodable(#[source] RecordError),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("path {0:?} is used as both a file and a directory")]
    PathConflict(String),

    #[error("tree {0} nests deeper than the supported limit")]
    TreeTooDeep(Digest),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Stable category name, independent of message wording
    pub fn category(&self) -> &'static str {
        match self {
            StoreError::ObjectNotFound(_) => "object-not-found",
            StoreError::ObjectKindMismatch { .. } => "object-kind-mismatch",
            StoreError::StoreWriteError { .. } => "store-write-error",
            StoreError::CorruptObject { .. } => "corrupt-object",
            StoreError::Unencodable(_) => "unencodable",
            StoreError::InvalidPath { .. } => "invalid-path",
            StoreError::PathConflict(_) => "path-conflict",
            StoreError::TreeTooDeep(_) => "tree-too-deep",
            StoreError::Io { .. } => "io",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
