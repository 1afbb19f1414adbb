//! Mutable repository state around the immutable object store
//!
//! This crate provides:
//! - The `.mgit/` directory layout
//! - HEAD ref with atomic replacement
//! - Commit chain (parent validation, compare-and-swap HEAD, history walk)
//! - Append-only revocation registry
//! - The index (stage) of path -> blob digest
//! - Advisory repository locks (flock)

pub mod chain;
pub mod error;
pub mod index;
pub mod layout;
pub mod locks;
pub mod refs;
pub mod revocation;

// Re-exports
pub use chain::{CommitChain, History};
pub use error::{ChainError, InvalidParentReason};
pub use index::Index;
pub use layout::Layout;
pub use locks::{LockMode, RepoLock};
pub use refs::Refs;
pub use revocation::{RevocationRecord, RevocationRegistry};

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Current wall-clock time in Unix milliseconds
pub fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
