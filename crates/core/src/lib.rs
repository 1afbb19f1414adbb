//! mgit core - content-addressed storage primitives
//!
//! This crate provides the foundational storage layer:
//! - BLAKE3 digests
//! - Kind-tagged object records (blob, tree, commit)
//! - The on-disk object store
//! - Tree building from a staged path set

pub mod hash;
pub mod object;
pub mod error;
pub mod tree;
pub mod commit;
pub mod store;

// Re-export main types for convenience
pub use hash::{hash_bytes, Digest, IncrementalHasher, ParseDigestError};
pub use object::{ObjectKind, RecordError};
pub use error::StoreError;
pub use tree::{EntryKind, Tree, TreeBuilder, TreeEntry};
pub use commit::Commit;
pub use store::ObjectStore;

/// Common result type used throughout mgit-core
pub type Result<T> = std::result::Result<T, StoreError>;
