//! Stage files for the next commit

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub fn run(paths: &[PathBuf]) -> Result<()> {
    let repo = util::open_repo()?;
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    // Paths are typed relative to the shell's directory, not the repo root
    let absolute: Vec<PathBuf> = paths.iter().map(|p| cwd.join(p)).collect();
    let staged = repo.stage(&absolute).context("Failed to stage files")?;

    for (path, digest) in &staged {
        println!("{} {}  {}", "staged".green(), digest.short().dimmed(), path);
    }
    if staged.is_empty() {
        println!("{}", "Nothing to stage".yellow());
    }
    Ok(())
}
