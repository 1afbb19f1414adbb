//! Create a repository in the current directory

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use repo::Repository;

pub fn run() -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let repo = Repository::init(&cwd).context("Failed to initialize repository")?;

    println!(
        "{} empty mgit repository in {}",
        "Initialized".green(),
        repo.layout().repo_dir().display().to_string().cyan()
    );
    Ok(())
}
