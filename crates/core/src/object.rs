//! Typed object records and their framing
//!
//! Every stored object is a *record*: a 4-byte magic naming its kind,
//! followed by the kind-specific canonical payload. The digest of an object
//! is the BLAKE3 hash of the whole record, so the kind participates in the
//! object's identity.

use crate::hash::{Digest, IncrementalHasher};
use std::fmt;
use thiserror::Error;

/// Length of the record header (the kind magic)
pub const RECORD_HEADER_LEN: usize = 4;

/// Kind of a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    const BLOB_MAGIC: [u8; 4] = *b"MGB1";
    const TREE_MAGIC: [u8; 4] = *b"MGT1";
    const COMMIT_MAGIC: [u8; 4] = *b"MGC1";

    /// Magic bytes that open a record of this kind
    pub const fn magic(self) -> [u8; 4] {
        match self {
            ObjectKind::Blob => Self::BLOB_MAGIC,
            ObjectKind::Tree => Self::TREE_MAGIC,
            ObjectKind::Commit => Self::COMMIT_MAGIC,
        }
    }

    /// Recognize a record header
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic == Self::BLOB_MAGIC {
            Some(ObjectKind::Blob)
        } else if magic == Self::TREE_MAGIC {
            Some(ObjectKind::Tree)
        } else if magic == Self::COMMIT_MAGIC {
            Some(ObjectKind::Commit)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a record or payload fails to decode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record too short for a header")]
    MissingHeader,
    #[error("unknown record magic {0:?}")]
    UnknownMagic([u8; 4]),
    #[error("payload truncated while reading {0}")]
    Truncated(&'static str),
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
    #[error("invalid entry kind byte {0}")]
    InvalidEntryKind(u8),
    #[error("invalid parent flag {0}")]
    InvalidParentFlag(u8),
    #[error("invalid entry name {0:?}")]
    InvalidName(String),
    #[error("entry names not strictly sorted at {0:?}")]
    Unsorted(String),
    #[error("duplicate entry name {0:?}")]
    DuplicateName(String),
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
    #[error("{0} exceeds the encodable length")]
    TooLong(&'static str),
    #[error("content hashes to {actual}")]
    DigestMismatch { actual: Digest },
}

/// Frame a payload into a record
pub fn encode_record(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
    record.extend_from_slice(&kind.magic());
    record.extend_from_slice(payload);
    record
}

/// Split a record into its kind and payload
pub fn split_record(record: &[u8]) -> Result<(ObjectKind, &[u8]), RecordError> {
    if record.len() < RECORD_HEADER_LEN {
        return Err(RecordError::MissingHeader);
    }
    let (magic, payload) = record.split_at(RECORD_HEADER_LEN);
    match ObjectKind::from_magic(magic) {
        Some(kind) => Ok((kind, payload)),
        None => Err(RecordError::UnknownMagic([magic[0], magic[1], magic[2], magic[3]])),
    }
}

/// Digest of the record `kind ‖ payload`, without materializing it
pub fn record_digest(kind: ObjectKind, payload: &[u8]) -> Digest {
    let mut hasher = IncrementalHasher::new();
    hasher.update(&kind.magic());
    hasher.update(payload);
    hasher.finalize()
}

/// Cursor over a canonical payload
///
/// All integers are little-endian.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], RecordError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(RecordError::Truncated(what))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self, what: &'static str) -> Result<u8, RecordError> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &'static str) -> Result<u16, RecordError> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self, what: &'static str) -> Result<u32, RecordError> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self, what: &'static str) -> Result<u64, RecordError> {
        let b = self.take(8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    pub(crate) fn digest(&mut self, what: &'static str) -> Result<Digest, RecordError> {
        let b = self.take(32, what)?;
        let mut raw = [0u8; 32];
        raw.copy_from_slice(b);
        Ok(Digest::from_bytes(raw))
    }

    pub(crate) fn utf8(&mut self, len: usize, what: &'static str) -> Result<&'a str, RecordError> {
        let b = self.take(len, what)?;
        std::str::from_utf8(b).map_err(|_| RecordError::InvalidUtf8(what))
    }

    pub(crate) fn finish(self) -> Result<(), RecordError> {
        match self.bytes.len() - self.offset {
            0 => Ok(()),
            rest => Err(RecordError::TrailingBytes(rest)),
        }
    }
}
