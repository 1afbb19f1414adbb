//! Commit objects

use crate::hash::Digest;
use crate::object::{record_digest, ObjectKind, Reader, RecordError};

/// A snapshot of one tree plus its place in history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Root tree of the snapshot
    pub tree: Digest,
    /// Previous commit, `None` for a root commit
    pub parent: Option<Digest>,
    pub author: String,
    /// Author timestamp (Unix milliseconds)
    pub timestamp_ms: u64,
    pub message: String,
}

impl Commit {
    pub fn new(
        tree: Digest,
        parent: Option<Digest>,
        author: impl Into<String>,
        timestamp_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parent,
            author: author.into(),
            timestamp_ms,
            message: message.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Canonical payload
    ///
    /// Format (little-endian):
    /// - tree: [u8; 32]
    /// - has_parent: u8 (0 or 1), then parent: [u8; 32] when 1
    /// - timestamp_ms: u64
    /// - author_len: u16, author: UTF-8
    /// - message_len: u32, message: UTF-8
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        if self.author.len() > u16::MAX as usize {
            return Err(RecordError::TooLong("author"));
        }
        if self.message.len() > u32::MAX as usize {
            return Err(RecordError::TooLong("message"));
        }

        let mut bytes = Vec::with_capacity(32 + 33 + 8 + 2 + self.author.len() + 4 + self.message.len());
        bytes.extend_from_slice(self.tree.as_bytes());
        match &self.parent {
            Some(parent) => {
                bytes.push(1);
                bytes.extend_from_slice(parent.as_bytes());
            }
            None => bytes.push(0),
        }
        bytes.extend_from_slice(&self.timestamp_ms.to_le_bytes());
        bytes.extend_from_slice(&(self.author.len() as u16).to_le_bytes());
        bytes.extend_from_slice(self.author.as_bytes());
        bytes.extend_from_slice(&(self.message.len() as u32).to_le_bytes());
        bytes.extend_from_slice(self.message.as_bytes());
        Ok(bytes)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, RecordError> {
        let mut reader = Reader::new(payload);
        let tree = reader.digest("tree digest")?;
        let parent = match reader.u8("parent flag")? {
            0 => None,
            1 => Some(reader.digest("parent digest")?),
            other => return Err(RecordError::InvalidParentFlag(other)),
        };
        let timestamp_ms = reader.u64("timestamp")?;
        let author_len = reader.u16("author length")? as usize;
        let author = reader.utf8(author_len, "author")?.to_string();
        let message_len = reader.u32("message length")? as usize;
        let message = reader.utf8(message_len, "message")?.to_string();
        reader.finish()?;

        Ok(Self {
            tree,
            parent,
            author,
            timestamp_ms,
            message,
        })
    }

    /// Digest of this commit's record
    pub fn digest(&self) -> Result<Digest, RecordError> {
        Ok(record_digest(ObjectKind::Commit, &self.encode()?))
    }
}
