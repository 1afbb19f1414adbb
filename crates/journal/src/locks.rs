//! Advisory repository locks
//!
//! One lock file (`locks/repo.lock`) guards every mutation of mutable state.
//! Writers (HEAD updates, revocations, staging) take it exclusively; readers
//! that must see a consistent HEAD + registry (verify, checkout, status)
//! take it shared. Attempts never block.

use crate::error::ChainError;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// A held repository lock, released on drop
pub struct RepoLock {
    path: PathBuf,
    mode: LockMode,
    file: File,
}

impl RepoLock {
    /// Acquire the lock at `lock_path` without blocking
    ///
    /// Returns `LockContended` if another holder has an incompatible lock.
    pub fn acquire(lock_path: &Path, mode: LockMode) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChainError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| ChainError::io(lock_path, e))?;

        if !try_flock(&file, mode).map_err(|e| ChainError::io(lock_path, e))? {
            tracing::debug!(path = %lock_path.display(), ?mode, "lock contended");
            return Err(ChainError::LockContended(lock_path.to_path_buf()));
        }

        Ok(Self {
            path: lock_path.to_path_buf(),
            mode,
            file,
        })
    }

    pub fn shared(lock_path: &Path) -> Result<Self> {
        Self::acquire(lock_path, LockMode::Shared)
    }

    pub fn exclusive(lock_path: &Path) -> Result<Self> {
        Self::acquire(lock_path, LockMode::Exclusive)
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well
        let _ = unlock(&self.file);
    }
}

/// Try to take a flock (non-blocking)
#[cfg(unix)]
fn try_flock(file: &File, mode: LockMode) -> std::io::Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    let arg = match mode {
        LockMode::Shared => FlockArg::LockSharedNonblock,
        LockMode::Exclusive => FlockArg::LockExclusiveNonblock,
    };

    match flock(file.as_raw_fd(), arg) {
        Ok(()) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(std::io::Error::from(e)),
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> std::io::Result<()> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    flock(file.as_raw_fd(), FlockArg::Unlock).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn try_flock(_file: &File, _mode: LockMode) -> std::io::Result<bool> {
    // No advisory locking on this platform
    Ok(true)
}

#[cfg(not(unix))]
fn unlock(_file: &File) -> std::io::Result<()> {
    Ok(())
}
