//! On-disk layout of a repository

use mgit_core::ObjectStore;
use std::path::{Path, PathBuf};

/// Name of the repository directory inside the working tree
pub const REPO_DIR: &str = ".mgit";

/// Paths of everything under `.mgit/`
#[derive(Debug, Clone)]
pub struct Layout {
    work_root: PathBuf,
    repo_dir: PathBuf,
}

impl Layout {
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        let work_root = work_root.into();
        let repo_dir = work_root.join(REPO_DIR);
        Self { work_root, repo_dir }
    }

    /// Working tree root (the directory containing `.mgit/`)
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.repo_dir.join("objects")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.repo_dir.join("tmp")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.repo_dir.join("locks")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.locks_dir().join("repo.lock")
    }

    pub fn head_path(&self) -> PathBuf {
        self.repo_dir.join("HEAD")
    }

    pub fn index_path(&self) -> PathBuf {
        self.repo_dir.join("index")
    }

    pub fn revoked_path(&self) -> PathBuf {
        self.repo_dir.join("revoked.log")
    }

    pub fn config_path(&self) -> PathBuf {
        self.repo_dir.join("config.toml")
    }

    /// Object store rooted at this layout
    pub fn object_store(&self, fsync: bool) -> ObjectStore {
        ObjectStore::new(self.objects_dir(), self.tmp_dir()).with_fsync(fsync)
    }
}
