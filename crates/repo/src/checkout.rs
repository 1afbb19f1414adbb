//! Materializing a commit's tree into a directory

use crate::error::RepoError;
use crate::Result;
use journal::layout::REPO_DIR;
use mgit_core::store::atomic_write;
use mgit_core::tree::flatten;
use mgit_core::{Digest, ObjectStore, StoreError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub commit: Digest,
    pub files_written: usize,
    pub dirs_created: usize,
}

/// Everything needed to write a tree, resolved up front
struct Plan {
    dirs: BTreeSet<PathBuf>,
    files: Vec<(PathBuf, Digest)>,
}

/// Write the tree of `commit` into `target`
///
/// Callers have already checked that `commit` is a stored, unrevoked
/// commit. Every tree and blob is read and re-hashed before the first write,
/// so a damaged store leaves `target` untouched. Files in `target` that the
/// tree does not mention are kept.
pub(crate) fn materialize(
    store: &ObjectStore,
    commit: Digest,
    target: &Path,
    fsync: bool,
) -> Result<CheckoutSummary> {
    let plan = plan(store, commit, target)?;

    let mut dirs_created = 0;
    if !target.is_dir() {
        std::fs::create_dir_all(target).map_err(|e| RepoError::io(target, e))?;
        dirs_created += 1;
    }
    for dir in &plan.dirs {
        if !dir.is_dir() {
            std::fs::create_dir_all(dir).map_err(|e| RepoError::io(dir, e))?;
            dirs_created += 1;
        }
    }

    for (path, blob) in &plan.files {
        let content = store.read_blob(*blob)?;
        let parent = path.parent().unwrap_or(target);
        // Temp file next to the destination keeps the rename on one filesystem
        atomic_write(parent, path, &content, fsync).map_err(|e| RepoError::io(path, e))?;
    }

    tracing::info!(
        commit = %commit.short(),
        target = %target.display(),
        files = plan.files.len(),
        "checkout complete"
    );
    Ok(CheckoutSummary {
        commit,
        files_written: plan.files.len(),
        dirs_created,
    })
}

fn plan(store: &ObjectStore, commit: Digest, target: &Path) -> Result<Plan> {
    let commit = store.read_commit(commit)?;
    let listing = flatten(store, commit.tree)?;

    let mut dirs = BTreeSet::new();
    let mut files = Vec::with_capacity(listing.len());

    for (path, blob) in listing {
        if path.split('/').next() == Some(REPO_DIR) {
            return Err(StoreError::InvalidPath {
                path,
                reason: "inside the repository directory",
            }
            .into());
        }
        // Read for the hash check only; contents are re-read while writing
        store.read_blob(blob)?;

        let mut components: Vec<&str> = path.split('/').collect();
        components.pop();
        let mut dir = target.to_path_buf();
        for component in components {
            dir.push(component);
            if dir.exists() && !dir.is_dir() {
                return Err(StoreError::PathConflict(dir.display().to_string()).into());
            }
            dirs.insert(dir.clone());
        }

        let file = target.join(&path);
        if file.is_dir() {
            return Err(StoreError::PathConflict(file.display().to_string()).into());
        }
        files.push((file, blob));
    }

    Ok(Plan { dirs, files })
}
