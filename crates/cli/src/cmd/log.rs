//! Show commit history

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub fn run(limit: Option<usize>) -> Result<()> {
    let repo = util::open_repo()?;
    let entries = repo.log(limit).context("Failed to read history")?;

    if entries.is_empty() {
        println!("{}", "No commits yet".dimmed());
        return Ok(());
    }

    for entry in &entries {
        let marker = if entry.revoked {
            format!(" {}", "[revoked]".red())
        } else {
            String::new()
        };
        println!("{} {}{}", "commit".yellow(), entry.digest.to_hex().yellow(), marker);
        println!("Author: {}", entry.commit.author);
        println!(
            "Date:   {} ({})",
            util::format_absolute_time(entry.commit.timestamp_ms),
            util::format_relative_time(entry.commit.timestamp_ms).dimmed()
        );
        println!();
        for line in entry.commit.message.lines() {
            println!("    {}", line);
        }
        println!();
    }
    Ok(())
}
