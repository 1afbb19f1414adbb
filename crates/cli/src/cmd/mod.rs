//! CLI command implementations

pub mod add;
pub mod cat_file;
pub mod checkout;
pub mod commit;
pub mod init;
pub mod log;
pub mod revoke;
pub mod status;
pub mod verify;
