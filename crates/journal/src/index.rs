//! Index (stage): path -> blob digest for the next commit
//!
//! Stored as a sorted JSON object. The index is retained after a commit, so
//! it always describes the last staged snapshot.

use crate::error::ChainError;
use crate::Result;
use mgit_core::store::atomic_write;
use mgit_core::Digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    entries: BTreeMap<String, Digest>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from disk; a missing file is an empty index
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(ChainError::io(path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| ChainError::corrupt(path, e))
    }

    /// Replace the file atomically
    pub fn save(&self, path: &Path, tmp_dir: &Path, fsync: bool) -> Result<()> {
        let mut json =
            serde_json::to_vec_pretty(self).map_err(|e| ChainError::corrupt(path, e))?;
        json.push(b'\n');
        atomic_write(tmp_dir, path, &json, fsync).map_err(|e| ChainError::io(path, e))?;
        tracing::debug!(entries = self.entries.len(), "index saved");
        Ok(())
    }

    /// Stage `path`, returning the digest it replaced
    pub fn insert(&mut self, path: impl Into<String>, digest: Digest) -> Option<Digest> {
        self.entries.insert(path.into(), digest)
    }

    pub fn remove(&mut self, path: &str) -> Option<Digest> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<Digest> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Digest)> {
        self.entries.iter().map(|(path, digest)| (path.as_str(), *digest))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
