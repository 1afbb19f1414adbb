//! Revocation registry
//!
//! An append-only log (`revoked.log`) with one JSON record per line. A
//! revoked commit can never be checked out again; revocation does not
//! propagate to ancestors or descendants.

use crate::error::ChainError;
use crate::layout::Layout;
use crate::locks::RepoLock;
use crate::{current_timestamp_ms, Result};
use ahash::AHashSet;
use mgit_core::store::atomic_write;
use mgit_core::{Digest, ObjectKind, ObjectStore, StoreError};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// One line of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RevocationRecord {
    Revoke { commit: Digest, ts_unix_ms: u64 },
}

impl RevocationRecord {
    pub fn commit(&self) -> Digest {
        match self {
            RevocationRecord::Revoke { commit, .. } => *commit,
        }
    }
}

pub struct RevocationRegistry<'s> {
    store: &'s ObjectStore,
    log_path: PathBuf,
    lock_path: PathBuf,
    tmp_dir: PathBuf,
    fsync: bool,
}

impl<'s> RevocationRegistry<'s> {
    pub fn new(store: &'s ObjectStore, layout: &Layout) -> Self {
        Self {
            store,
            log_path: layout.revoked_path(),
            lock_path: layout.lock_path(),
            tmp_dir: layout.tmp_dir(),
            fsync: true,
        }
    }

    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Revoke a stored commit
    ///
    /// Returns `false` if it was already revoked. The commit only needs a
    /// commit header; a tampered commit can still be revoked.
    pub fn revoke(&self, commit: Digest) -> Result<bool> {
        match self.store.kind_of(commit) {
            Ok(ObjectKind::Commit) => {}
            Ok(_) | Err(StoreError::ObjectNotFound(_)) => {
                return Err(ChainError::UnknownCommit(commit))
            }
            Err(e) => return Err(e.into()),
        }

        let _lock = RepoLock::exclusive(&self.lock_path)?;

        let existing = read_log(&self.log_path)?;
        if existing.records.iter().any(|r| r.commit() == commit) {
            tracing::debug!(commit = %commit.short(), "already revoked");
            return Ok(false);
        }

        let record = RevocationRecord::Revoke {
            commit,
            ts_unix_ms: current_timestamp_ms(),
        };
        if existing.torn_tail {
            // Rewrite without the partial line instead of appending after it
            let mut records = existing.records;
            records.push(record);
            self.rewrite(&records)?;
        } else {
            self.append(encode_line(&record, &self.log_path)?.as_bytes())?;
        }
        tracing::info!(commit = %commit.short(), "commit revoked");
        Ok(true)
    }

    fn append(&self, bytes: &[u8]) -> Result<()> {
        let io_err = |e| ChainError::io(&self.log_path, e);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        if self.fsync {
            file.sync_all().map_err(io_err)?;
        }
        Ok(())
    }

    fn rewrite(&self, records: &[RevocationRecord]) -> Result<()> {
        let mut text = String::new();
        for record in records {
            text.push_str(&encode_line(record, &self.log_path)?);
        }
        atomic_write(&self.tmp_dir, &self.log_path, text.as_bytes(), self.fsync)
            .map_err(|e| ChainError::io(&self.log_path, e))?;
        tracing::warn!(path = %self.log_path.display(), "revocation log repaired");
        Ok(())
    }

    pub fn is_revoked(&self, commit: Digest) -> Result<bool> {
        Ok(self.list()?.iter().any(|r| r.commit() == commit))
    }

    /// Every revoked digest, for callers checking many commits
    pub fn revoked_set(&self) -> Result<AHashSet<Digest>> {
        Ok(self.list()?.iter().map(RevocationRecord::commit).collect())
    }

    /// All records in log order
    pub fn list(&self) -> Result<Vec<RevocationRecord>> {
        Ok(read_log(&self.log_path)?.records)
    }
}

fn encode_line(record: &RevocationRecord, path: &Path) -> Result<String> {
    let mut line = serde_json::to_string(record).map_err(|e| ChainError::corrupt(path, e))?;
    line.push('\n');
    Ok(line)
}

struct LogContents {
    records: Vec<RevocationRecord>,
    /// The log does not end in a complete, terminated record
    torn_tail: bool,
}

fn read_log(path: &Path) -> Result<LogContents> {
    let mut text = String::new();
    match std::fs::File::open(path) {
        Ok(mut file) => {
            file.read_to_string(&mut text)
                .map_err(|e| ChainError::io(path, e))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(ChainError::io(path, e)),
    }

    let mut records = Vec::new();
    let unterminated = !text.is_empty() && !text.ends_with('\n');
    let lines: Vec<&str> = text.lines().collect();

    for (number, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RevocationRecord>(line) {
            Ok(record) => records.push(record),
            Err(_) if unterminated && number + 1 == lines.len() => {
                tracing::warn!(path = %path.display(), "ignoring torn revocation record");
            }
            Err(e) => {
                return Err(ChainError::corrupt(path, format!("line {}: {}", number + 1, e)))
            }
        }
    }

    // A parsed record without its newline is repaired the same way
    Ok(LogContents {
        records,
        torn_tail: unterminated,
    })
}
