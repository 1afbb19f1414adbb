//! Verify stored history

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use repo::VerifyScope;

/// Returns `false` when issues were found
pub fn run(rev: Option<&str>, single: bool) -> Result<bool> {
    let repo = util::open_repo()?;
    let commit = util::resolve_rev(&repo, rev)?;
    let scope = if single {
        VerifyScope::Single
    } else {
        repo.config().verify.scope
    };

    let report = repo.verify(commit, scope).context("Failed to verify")?;

    if report.ok() {
        println!(
            "{} {} ({} objects, {} commits)",
            "OK".green().bold(),
            commit.short().yellow(),
            report.objects_checked,
            report.commits_checked
        );
        return Ok(true);
    }

    println!(
        "{} {} issue(s) found from {}",
        "FAILED".red().bold(),
        report.issues.len(),
        commit.short().yellow()
    );
    for issue in &report.issues {
        println!(
            "  {} {} {}: {}",
            issue.kind.as_str().red(),
            issue.object,
            issue.digest.to_hex(),
            issue.description
        );
    }
    Ok(false)
}
