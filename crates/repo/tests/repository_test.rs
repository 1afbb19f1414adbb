//! End-to-end repository workflows

use mgit_core::{hash_bytes, Commit, ObjectKind, TreeBuilder};
use repo::{IssueKind, ObjectView, Repository, VerifyScope};
use std::fs;
use std::path::Path;

fn init_repo() -> anyhow::Result<(tempfile::TempDir, Repository)> {
    let temp_dir = tempfile::tempdir()?;
    let repo = Repository::init(temp_dir.path())?;
    Ok((temp_dir, repo))
}

fn write(root: &Path, path: &str, content: &str) -> anyhow::Result<()> {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(full, content)?;
    Ok(())
}

#[test]
fn test_empty_stage_commit_verifies() -> anyhow::Result<()> {
    let (_dir, repo) = init_repo()?;

    let root = repo.commit_staged("root")?;
    assert_eq!(repo.head()?, Some(root));

    let report = repo.verify(root, VerifyScope::History)?;
    assert!(report.ok(), "{:?}", report.issues);

    match repo.cat_object(root)? {
        ObjectView::Commit(commit) => {
            assert!(commit.parent.is_none());
            assert_eq!(commit.message, "root");
            assert!(repo.store().read_tree(commit.tree)?.is_empty());
        }
        other => panic!("expected a commit, got {:?}", other.kind()),
    }
    Ok(())
}

#[test]
fn test_tampered_blob_yields_one_issue() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "a.txt", "hello")?;

    let staged = repo.stage(&["a.txt"])?;
    let blob = staged[0].1;
    let commit = repo.commit_staged("add a")?;
    assert!(repo.verify(commit, VerifyScope::History)?.ok());

    fs::write(repo.store().object_path(&blob), b"MGB1hellO")?;

    let report = repo.verify(commit, VerifyScope::History)?;
    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.kind, IssueKind::DigestMismatch);
    assert_eq!(issue.object, ObjectKind::Blob);
    assert_eq!(issue.digest, blob);
    Ok(())
}

#[test]
fn test_overwritten_blob_yields_one_issue() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "a.txt", "hello")?;

    let blob = repo.stage(&["a.txt"])?[0].1;
    let commit = repo.commit_staged("add a")?;

    // Header is replaced too, so the record no longer reads as a blob
    fs::write(repo.store().object_path(&blob), b"tampered")?;

    let report = repo.verify(commit, VerifyScope::History)?;
    assert_eq!(report.issues.len(), 1, "{:?}", report.issues);
    let issue = &report.issues[0];
    assert_eq!(issue.kind, IssueKind::DigestMismatch);
    assert_eq!(issue.object, ObjectKind::Blob);
    assert_eq!(issue.digest, blob);
    Ok(())
}

#[test]
fn test_revoked_commit_cannot_be_checked_out() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;

    write(dir.path(), "a.txt", "v1")?;
    repo.stage(&["a.txt"])?;
    let c1 = repo.commit_staged("first")?;

    write(dir.path(), "a.txt", "v2")?;
    repo.stage(&["a.txt"])?;
    let c2 = repo.commit_staged("second")?;
    assert_eq!(repo.store().read_commit(c2)?.parent, Some(c1));

    assert!(repo.revoke(c1)?);
    assert!(repo.is_revoked(c1)?);
    assert!(!repo.is_revoked(c2)?);

    let target = tempfile::tempdir()?;
    let err = repo.checkout(c1, target.path()).unwrap_err();
    assert_eq!(err.category(), "revoked-commit");
    assert_eq!(fs::read_dir(target.path())?.count(), 0);

    let summary = repo.checkout(c2, target.path())?;
    assert_eq!(summary.files_written, 1);
    assert_eq!(fs::read_to_string(target.path().join("a.txt"))?, "v2");

    // HEAD stays where it was
    assert_eq!(repo.head()?, Some(c2));
    Ok(())
}

#[test]
fn test_checkout_unknown_and_non_commit() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "a.txt", "x")?;
    let blob = repo.stage(&["a.txt"])?[0].1;

    let target = tempfile::tempdir()?;
    let err = repo.checkout(hash_bytes(b"nope"), target.path()).unwrap_err();
    assert_eq!(err.category(), "unknown-commit");
    let err = repo.checkout(blob, target.path()).unwrap_err();
    assert_eq!(err.category(), "unknown-commit");
    Ok(())
}

#[test]
fn test_checkout_writes_nothing_when_an_object_is_missing() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "a.txt", "kept")?;
    write(dir.path(), "sub/b.txt", "lost")?;
    let staged = repo.stage(&["a.txt", "sub/b.txt"])?;
    let commit = repo.commit_staged("two files")?;

    let lost = staged.iter().find(|(p, _)| p == "sub/b.txt").map(|(_, d)| *d);
    fs::remove_file(repo.store().object_path(&lost.unwrap()))?;

    let target = tempfile::tempdir()?;
    let err = repo.checkout(commit, target.path()).unwrap_err();
    assert_eq!(err.category(), "object-not-found");
    assert_eq!(fs::read_dir(target.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_checkout_is_additive() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "docs/readme.md", "# hi")?;
    repo.stage(&["docs"])?;
    let commit = repo.commit_staged("docs")?;

    let target = tempfile::tempdir()?;
    write(target.path(), "untracked.txt", "mine")?;
    write(target.path(), "docs/readme.md", "stale")?;

    let summary = repo.checkout(commit, target.path())?;
    assert_eq!(summary.files_written, 1);
    assert_eq!(summary.dirs_created, 0);
    assert_eq!(fs::read_to_string(target.path().join("docs/readme.md"))?, "# hi");
    assert_eq!(fs::read_to_string(target.path().join("untracked.txt"))?, "mine");
    Ok(())
}

#[test]
fn test_checkout_refuses_paths_inside_repo_dir() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "a.txt", "x")?;
    let blob = repo.stage(&["a.txt"])?[0].1;
    let head = repo.commit_staged("a")?;

    let tree = TreeBuilder::new(repo.store()).build([("a.txt", blob), (".mgit/HEAD", blob)])?;
    let commit = repo.store().put_commit(&Commit::new(tree, Some(head), "t", 0, "forged"))?;

    let err = repo.checkout(commit, repo.work_root()).unwrap_err();
    assert_eq!(err.category(), "invalid-path");
    assert_eq!(repo.head()?, Some(head));
    assert_eq!(fs::read_to_string(dir.path().join("a.txt"))?, "x");
    Ok(())
}

#[test]
fn test_stage_directory_skips_repo_dir() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "src/main.rs", "fn main() {}")?;
    write(dir.path(), "src/lib/mod.rs", "")?;
    write(dir.path(), "top.txt", "t")?;

    let staged = repo.stage(&[dir.path()])?;
    let paths: Vec<&str> = staged.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["src/lib/mod.rs", "src/main.rs", "top.txt"]);

    let err = repo.stage(&[".mgit/HEAD"]).unwrap_err();
    assert_eq!(err.category(), "invalid-path");
    let err = repo.stage(&["../escape.txt"]).unwrap_err();
    assert_eq!(err.category(), "io");
    Ok(())
}

#[test]
fn test_large_files_are_staged_through_mmap() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    Repository::init(temp_dir.path())?;
    fs::write(
        temp_dir.path().join(".mgit/config.toml"),
        "[store]\nmmap_threshold = 16\nfsync = false\n",
    )?;
    let repo = Repository::open(temp_dir.path())?;
    assert_eq!(repo.config().store.mmap_threshold, 16);

    let content = "large enough to be mapped".repeat(100);
    write(temp_dir.path(), "big.bin", &content)?;
    let blob = repo.stage(&["big.bin"])?[0].1;
    assert_eq!(repo.store().read_blob(blob)?, content.as_bytes());
    Ok(())
}

#[test]
fn test_status_tracks_working_tree() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    write(dir.path(), "a.txt", "one")?;
    write(dir.path(), "b.txt", "two")?;
    repo.stage(&["a.txt", "b.txt"])?;

    let status = repo.status()?;
    assert_eq!(status.head, None);
    assert_eq!(status.working_tree_matches_head, None);
    assert_eq!(status.staged_paths, vec!["a.txt", "b.txt"]);

    repo.commit_staged("both")?;
    assert_eq!(repo.status()?.working_tree_matches_head, Some(true));

    write(dir.path(), "a.txt", "changed")?;
    fs::remove_file(dir.path().join("b.txt"))?;
    let status = repo.status()?;
    assert_eq!(status.working_tree_matches_head, Some(false));
    assert_eq!(status.modified, vec!["a.txt"]);
    assert_eq!(status.missing, vec!["b.txt"]);
    Ok(())
}

#[test]
fn test_log_and_resolve() -> anyhow::Result<()> {
    let (dir, repo) = init_repo()?;
    assert!(repo.log(None)?.is_empty());
    assert_eq!(repo.resolve("HEAD").unwrap_err().category(), "no-head");

    let mut commits = Vec::new();
    for i in 0..3 {
        write(dir.path(), "n.txt", &i.to_string())?;
        repo.stage(&["n.txt"])?;
        commits.push(repo.commit_staged(&format!("commit {}", i))?);
    }
    repo.revoke(commits[0])?;

    let log = repo.log(None)?;
    let digests: Vec<_> = log.iter().map(|e| e.digest).collect();
    assert_eq!(digests, vec![commits[2], commits[1], commits[0]]);
    assert_eq!(log.iter().filter(|e| e.revoked).count(), 1);
    assert!(log[2].revoked);
    assert_eq!(repo.log(Some(2))?.len(), 2);

    assert_eq!(repo.resolve("HEAD")?, commits[2]);
    assert_eq!(repo.resolve(&commits[1].to_hex())?, commits[1]);
    assert_eq!(repo.resolve(&commits[1].to_hex()[..12])?, commits[1]);
    assert_eq!(repo.resolve("abc").unwrap_err().category(), "unknown-reference");
    assert_eq!(repo.resolve("zzzzzz").unwrap_err().category(), "unknown-reference");
    Ok(())
}

#[test]
fn test_init_open_discover() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let err = Repository::open(temp_dir.path()).err().map(|e| e.category());
    assert_eq!(err, Some("not-initialized"));

    Repository::init(temp_dir.path())?;
    let err = Repository::init(temp_dir.path()).err().map(|e| e.category());
    assert_eq!(err, Some("already-initialized"));

    let nested = temp_dir.path().join("a/b/c");
    fs::create_dir_all(&nested)?;
    let repo = Repository::discover(&nested)?;
    assert_eq!(repo.work_root(), temp_dir.path());
    assert_eq!(fs::read_to_string(repo.layout().head_path())?, "");
    assert_eq!(fs::read_to_string(repo.layout().revoked_path())?, "");
    Ok(())
}
