//! Errors raised by refs, the commit chain and the revocation registry

use mgit_core::{Digest, StoreError};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a proposed parent was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidParentReason {
    /// No object with that digest is stored
    Missing,
    /// The digest names a blob or a tree
    NotACommit,
    /// HEAD moved since the caller read it
    NotHead { head: Option<Digest> },
}

impl fmt::Display for InvalidParentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidParentReason::Missing => f.write_str("no such object"),
            InvalidParentReason::NotACommit => f.write_str("object is not a commit"),
            InvalidParentReason::NotHead { head: Some(head) } => {
                write!(f, "HEAD is now {}", head.short())
            }
            InvalidParentReason::NotHead { head: None } => f.write_str("HEAD is unset"),
        }
    }
}

fn parent_label(parent: &Option<Digest>) -> String {
    match parent {
        Some(digest) => digest.to_hex(),
        None => "<none>".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid parent {}: {reason}", parent_label(.parent))]
    InvalidParent {
        parent: Option<Digest>,
        reason: InvalidParentReason,
    },

    #[error("broken chain: commit {child} references parent {missing}, which is not a stored commit")]
    BrokenChain { child: Digest, missing: Digest },

    #[error("history revisits commit {0}")]
    CyclicHistory(Digest),

    #[error("unknown commit: {0}")]
    UnknownCommit(Digest),

    #[error("repository is locked by another process ({})", .0.display())]
    LockContended(PathBuf),

    #[error("malformed {}: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ChainError {
    /// Stable category name, independent of message wording
    pub fn category(&self) -> &'static str {
        match self {
            ChainError::InvalidParent { .. } => "invalid-parent",
            ChainError::BrokenChain { .. } | ChainError::CyclicHistory(_) => "broken-chain",
            ChainError::UnknownCommit(_) => "unknown-commit",
            ChainError::LockContended(_) => "lock-contended",
            ChainError::CorruptState { .. } => "corrupt-state",
            ChainError::Store(err) => err.category(),
            ChainError::Io { .. } => "io",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ChainError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        ChainError::CorruptState {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
