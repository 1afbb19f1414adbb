//! Repository-level operations for mgit
//!
//! Ties the object store and the journal together behind an explicit
//! [`Repository`] context:
//! - init / open / discover of `.mgit/`
//! - staging, committing, status and log
//! - integrity verification
//! - revocation-gated checkout

pub mod checkout;
pub mod config;
pub mod error;
pub mod repository;
pub mod verify;

pub use checkout::CheckoutSummary;
pub use config::Config;
pub use error::RepoError;
pub use repository::{LogEntry, ObjectView, Repository, Status};
pub use verify::{IssueKind, VerificationIssue, VerificationReport, VerifyScope};

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;
