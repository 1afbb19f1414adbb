//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use mgit_core::Digest;
use repo::Repository;

/// Open the repository containing the current directory
pub fn open_repo() -> Result<Repository> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Repository::discover(&cwd).context("Not an mgit repository (no .mgit directory found)")
}

/// Resolve a user-supplied reference, defaulting to HEAD
pub fn resolve_rev(repo: &Repository, rev: Option<&str>) -> Result<Digest> {
    let reference = rev.unwrap_or("HEAD");
    repo.resolve(reference)
        .with_context(|| format!("Failed to resolve '{}'", reference))
}

/// First line of a commit message
pub fn summary_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let datetime = UNIX_EPOCH + Duration::from_millis(ts_ms);

    if let Ok(elapsed) = SystemTime::now().duration_since(datetime) {
        let seconds = elapsed.as_secs();

        if seconds < 60 {
            format!("{} seconds ago", seconds)
        } else if seconds < 3600 {
            format!("{} minutes ago", seconds / 60)
        } else if seconds < 86400 {
            format!("{} hours ago", seconds / 3600)
        } else if seconds < 604800 {
            format!("{} days ago", seconds / 86400)
        } else {
            format!("{} weeks ago", seconds / 604800)
        }
    } else {
        "in the future".to_string()
    }
}

/// Format timestamp as UTC civil time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts_ms: u64) -> String {
    let secs = ts_ms / 1000;
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    // http://howardhinnant.github.io/date_algorithms.html (civil_from_days)
    let epoch_days = days + 719468;
    let era = epoch_days / 146097;
    let doe = epoch_days - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { yoe + era * 400 + 1 } else { yoe + era * 400 };

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, m, d, hours, minutes, seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_absolute_time() {
        assert_eq!(format_absolute_time(0), "1970-01-01 00:00:00");
        assert_eq!(format_absolute_time(1_700_000_000_000), "2023-11-14 22:13:20");
        assert_eq!(format_absolute_time(951_782_400_000), "2000-02-29 00:00:00");
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(summary_line("subject\n\nbody"), "subject");
        assert_eq!(summary_line(""), "");
    }
}
