//! Revoke a commit

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub fn run(rev: &str) -> Result<()> {
    let repo = util::open_repo()?;
    let commit = util::resolve_rev(&repo, Some(rev))?;

    if repo.revoke(commit).context("Failed to revoke")? {
        println!("{} {}", "Revoked".red(), commit.to_hex());
    } else {
        println!("{} already revoked", commit.to_hex().dimmed());
    }
    Ok(())
}
