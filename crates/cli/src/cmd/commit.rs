//! Commit the staged snapshot

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub fn run(message: &str) -> Result<()> {
    let repo = util::open_repo()?;
    let digest = repo.commit_staged(message).context("Failed to commit")?;
    let commit = repo.store().read_commit(digest)?;

    let label = if commit.is_root() { "root commit" } else { "commit" };
    println!(
        "[{} {}] {}",
        label,
        digest.short().yellow(),
        util::summary_line(&commit.message)
    );
    Ok(())
}
