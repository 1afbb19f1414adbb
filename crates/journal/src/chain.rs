//! Commit chain: appending commits and walking history

use crate::error::{ChainError, InvalidParentReason};
use crate::layout::Layout;
use crate::locks::RepoLock;
use crate::refs::Refs;
use crate::{current_timestamp_ms, Result};
use ahash::AHashSet;
use mgit_core::{Commit, Digest, ObjectKind, ObjectStore, StoreError};
use std::path::PathBuf;

/// Appends commits to the store and advances HEAD
pub struct CommitChain<'s> {
    store: &'s ObjectStore,
    refs: Refs,
    lock_path: PathBuf,
    author: String,
    clock: fn() -> u64,
}

impl<'s> CommitChain<'s> {
    pub fn new(store: &'s ObjectStore, layout: &Layout) -> Self {
        Self {
            store,
            refs: Refs::new(layout),
            lock_path: layout.lock_path(),
            author: "unknown".to_string(),
            clock: current_timestamp_ms,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Override the timestamp source
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_refs(mut self, refs: Refs) -> Self {
        self.refs = refs;
        self
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn head(&self) -> Result<Option<Digest>> {
        self.refs.head()
    }

    /// Record a new commit of `tree` on top of `parent` and move HEAD to it
    ///
    /// `parent` must be the current HEAD (compare-and-swap); a caller that
    /// read HEAD before another writer advanced it gets `InvalidParent`.
    pub fn commit(&self, tree: Digest, message: &str, parent: Option<Digest>) -> Result<Digest> {
        let _lock = RepoLock::exclusive(&self.lock_path)?;

        if let Some(parent_digest) = parent {
            self.check_parent(parent_digest)?;
        }

        let head = self.refs.head()?;
        if head != parent {
            return Err(ChainError::InvalidParent {
                parent,
                reason: InvalidParentReason::NotHead { head },
            });
        }

        // Tree must be present before anything references it
        self.store.read_tree(tree)?;

        let commit = Commit::new(tree, parent, self.author.clone(), (self.clock)(), message);
        let digest = self.store.put_commit(&commit)?;
        self.refs.set_head(digest)?;

        tracing::info!(
            commit = %digest.short(),
            tree = %tree.short(),
            root = parent.is_none(),
            "commit recorded"
        );
        Ok(digest)
    }

    fn check_parent(&self, parent: Digest) -> Result<()> {
        let invalid = |reason| ChainError::InvalidParent {
            parent: Some(parent),
            reason,
        };

        match self.store.kind_of(parent) {
            Ok(ObjectKind::Commit) => Ok(()),
            Ok(_) => Err(invalid(InvalidParentReason::NotACommit)),
            Err(StoreError::ObjectNotFound(_)) => Err(invalid(InvalidParentReason::Missing)),
            Err(e) => Err(e.into()),
        }
    }

    /// History from `start`, newest first
    pub fn history(&self, start: Digest) -> History<'s> {
        History::new(self.store, start)
    }
}

/// Lazy walk over parent links
///
/// Yields `(digest, commit)` pairs until a root commit. A missing start
/// yields `UnknownCommit`. A parent that is missing or not a commit yields
/// `BrokenChain`. Either ends the walk.
pub struct History<'s> {
    store: &'s ObjectStore,
    next: Option<Digest>,
    child: Option<Digest>,
    seen: AHashSet<Digest>,
}

impl<'s> History<'s> {
    pub fn new(store: &'s ObjectStore, start: Digest) -> Self {
        Self {
            store,
            next: Some(start),
            child: None,
            seen: AHashSet::new(),
        }
    }
}

impl Iterator for History<'_> {
    type Item = Result<(Digest, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let digest = self.next.take()?;

        if !self.seen.insert(digest) {
            return Some(Err(ChainError::CyclicHistory(digest)));
        }

        match self.store.read_commit(digest) {
            Ok(commit) => {
                self.next = commit.parent;
                self.child = Some(digest);
                Some(Ok((digest, commit)))
            }
            // A parent that is absent or not a commit breaks the chain
            Err(StoreError::ObjectNotFound(_) | StoreError::ObjectKindMismatch { .. }) => {
                Some(Err(match self.child {
                    Some(child) => ChainError::BrokenChain {
                        child,
                        missing: digest,
                    },
                    None => ChainError::UnknownCommit(digest),
                }))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}
