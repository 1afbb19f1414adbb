//! Repository errors

use journal::ChainError;
use mgit_core::{Digest, StoreError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not an mgit repository: {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("repository already exists at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("unknown commit: {0}")]
    UnknownCommit(Digest),

    #[error("commit {0} has been revoked")]
    RevokedCommit(Digest),

    #[error("no commits yet")]
    NoHead,

    #[error("unknown reference {0:?}")]
    UnknownReference(String),

    #[error("reference {prefix:?} is ambiguous ({count} objects match)")]
    AmbiguousReference { prefix: String, count: usize },

    #[error("invalid config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RepoError {
    /// Stable category name, independent of message wording
    pub fn category(&self) -> &'static str {
        match self {
            RepoError::NotInitialized(_) => "not-initialized",
            RepoError::AlreadyInitialized(_) => "already-initialized",
            RepoError::UnknownCommit(_) => "unknown-commit",
            RepoError::RevokedCommit(_) => "revoked-commit",
            RepoError::NoHead => "no-head",
            RepoError::UnknownReference(_) => "unknown-reference",
            RepoError::AmbiguousReference { .. } => "ambiguous-reference",
            RepoError::Config { .. } => "config",
            RepoError::Chain(err) => err.category(),
            RepoError::Store(err) => err.category(),
            RepoError::Io { .. } => "io",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RepoError::Io {
            path: path.into(),
            source,
        }
    }
}
