//! Print a stored object

use crate::util;
use anyhow::{Context, Result};
use repo::ObjectView;
use std::io::Write;

pub fn run(rev: &str) -> Result<()> {
    let repo = util::open_repo()?;
    let digest = util::resolve_rev(&repo, Some(rev))?;
    let object = repo
        .cat_object(digest)
        .with_context(|| format!("Failed to read object {}", digest))?;

    match object {
        ObjectView::Blob(content) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
        ObjectView::Tree(tree) => {
            for entry in tree.entries() {
                println!(
                    "{} {} {}",
                    entry.kind.object_kind(),
                    entry.digest.to_hex(),
                    entry.name
                );
            }
        }
        ObjectView::Commit(commit) => {
            println!("tree {}", commit.tree.to_hex());
            if let Some(parent) = commit.parent {
                println!("parent {}", parent.to_hex());
            }
            println!("author {}", commit.author);
            println!("timestamp {}", commit.timestamp_ms);
            println!();
            println!("{}", commit.message);
        }
    }
    Ok(())
}
