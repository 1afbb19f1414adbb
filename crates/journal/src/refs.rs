//! HEAD ref

use crate::error::ChainError;
use crate::layout::Layout;
use crate::Result;
use mgit_core::store::atomic_write;
use mgit_core::Digest;
use std::path::PathBuf;

/// The HEAD file: 64 hex characters, or empty when no commit exists yet
#[derive(Debug, Clone)]
pub struct Refs {
    head_path: PathBuf,
    tmp_dir: PathBuf,
    fsync: bool,
}

impl Refs {
    pub fn new(layout: &Layout) -> Self {
        Self {
            head_path: layout.head_path(),
            tmp_dir: layout.tmp_dir(),
            fsync: true,
        }
    }

    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Current HEAD, `None` before the first commit
    pub fn head(&self) -> Result<Option<Digest>> {
        let contents = match std::fs::read_to_string(&self.head_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ChainError::io(&self.head_path, e)),
        };

        let hex = contents.trim();
        if hex.is_empty() {
            return Ok(None);
        }
        Digest::from_hex(hex)
            .map(Some)
            .map_err(|e| ChainError::corrupt(&self.head_path, e))
    }

    /// Replace HEAD atomically
    ///
    /// Only the commit chain moves HEAD, after the commit object is durable.
    pub(crate) fn set_head(&self, digest: Digest) -> Result<()> {
        let line = format!("{}\n", digest.to_hex());
        atomic_write(&self.tmp_dir, &self.head_path, line.as_bytes(), self.fsync)
            .map_err(|e| ChainError::io(&self.head_path, e))?;
        tracing::debug!(head = %digest.short(), "HEAD moved");
        Ok(())
    }

    /// Reset HEAD to the unborn state (used by `init`)
    pub fn clear(&self) -> Result<()> {
        atomic_write(&self.tmp_dir, &self.head_path, b"", self.fsync)
            .map_err(|e| ChainError::io(&self.head_path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgit_core::hash_bytes;

    #[test]
    fn test_head_roundtrip() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let refs = Refs::new(&Layout::new(temp_dir.path())).with_fsync(false);

        assert_eq!(refs.head()?, None);
        refs.clear()?;
        assert_eq!(refs.head()?, None);

        let digest = hash_bytes(b"commit");
        refs.set_head(digest)?;
        assert_eq!(refs.head()?, Some(digest));
        Ok(())
    }

    #[test]
    fn test_garbage_head_is_corrupt_state() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let layout = Layout::new(temp_dir.path());
        std::fs::create_dir_all(layout.repo_dir())?;
        std::fs::write(layout.head_path(), "not-a-digest")?;

        let err = Refs::new(&layout).head().unwrap_err();
        assert_eq!(err.category(), "corrupt-state");
        Ok(())
    }
}
