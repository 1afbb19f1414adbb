//! Materialize a commit into a directory

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub fn run(rev: Option<&str>, target: Option<PathBuf>) -> Result<()> {
    let repo = util::open_repo()?;
    let commit = util::resolve_rev(&repo, rev)?;
    let target = target.unwrap_or_else(|| repo.work_root().to_path_buf());

    let summary = repo
        .checkout(commit, &target)
        .with_context(|| format!("Failed to check out {}", commit.short()))?;

    println!(
        "{} {} into {} ({} files, {} new directories)",
        "Checked out".green(),
        commit.short().yellow(),
        target.display().to_string().cyan(),
        summary.files_written,
        summary.dirs_created
    );
    Ok(())
}
