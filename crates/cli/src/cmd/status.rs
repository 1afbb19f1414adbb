//! Show HEAD and staged state

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let repo = util::open_repo()?;
    let status = repo.status().context("Failed to compute status")?;

    match status.head {
        Some(head) => println!("HEAD: {}", head.to_hex().yellow()),
        None => println!("HEAD: {}", "(no commits)".dimmed()),
    }

    println!("Staged files:");
    if status.staged_paths.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for path in &status.staged_paths {
        if status.missing.contains(path) {
            println!("  {} {}", path, "(missing)".red());
        } else if status.modified.contains(path) {
            println!("  {} {}", path, "(modified)".yellow());
        } else {
            println!("  {}", path);
        }
    }

    match status.working_tree_matches_head {
        Some(true) => println!("{}", "Working tree matches HEAD (for staged files)".green()),
        Some(false) => println!("{}", "Working tree differs from HEAD".yellow()),
        None => {}
    }
    Ok(())
}
