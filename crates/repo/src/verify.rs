//! Integrity verification
//!
//! Walks everything reachable from a commit, re-hashing each raw record and
//! decoding it as the kind its referrer expects. Problems are collected into
//! a report; the walk never stops early.

use ahash::{AHashMap, AHashSet};
use mgit_core::object::split_record;
use mgit_core::{hash_bytes, Commit, Digest, ObjectKind, ObjectStore, Tree};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much history a verification covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyScope {
    /// The commit, its tree, and every ancestor with its tree
    #[default]
    History,
    /// Only the commit and its tree
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Stored bytes no longer hash to the digest they are filed under
    DigestMismatch,
    MissingObject,
    /// Record header names a different kind than the reference expects
    KindMismatch,
    Undecodable,
    ParentCycle,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::DigestMismatch => "digest-mismatch",
            IssueKind::MissingObject => "missing-object",
            IssueKind::KindMismatch => "kind-mismatch",
            IssueKind::Undecodable => "undecodable",
            IssueKind::ParentCycle => "parent-cycle",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationIssue {
    pub kind: IssueKind,
    /// Kind the object was expected to be
    pub object: ObjectKind,
    pub digest: Digest,
    pub description: String,
}

impl fmt::Display for VerificationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.kind,
            self.object,
            self.digest.short(),
            self.description
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub issues: Vec<VerificationIssue>,
    /// Distinct objects examined
    pub objects_checked: usize,
    pub commits_checked: usize,
}

impl VerificationReport {
    pub fn ok(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues of one kind
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &VerificationIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }
}

/// Pending object together with who pointed at it
struct Visit {
    digest: Digest,
    expected: ObjectKind,
    referrer: String,
}

/// Issues collected so far, at most one per digest
#[derive(Default)]
struct Findings {
    issues: Vec<VerificationIssue>,
    by_digest: AHashMap<Digest, usize>,
}

impl Findings {
    /// Later problems with an already flagged digest extend its description
    fn file(&mut self, issue: VerificationIssue) {
        match self.by_digest.get(&issue.digest) {
            Some(&at) => {
                let existing = &mut self.issues[at];
                existing.description = format!(
                    "{}; {}: {}",
                    existing.description, issue.kind, issue.description
                );
            }
            None => {
                self.by_digest.insert(issue.digest, self.issues.len());
                self.issues.push(issue);
            }
        }
    }
}

/// Verify everything reachable from `root`
pub fn verify(store: &ObjectStore, root: Digest, scope: VerifyScope) -> VerificationReport {
    let mut report = VerificationReport::default();
    let mut findings = Findings::default();
    // Kind each digest was first checked as
    let mut checked_as: AHashMap<Digest, ObjectKind> = AHashMap::new();
    // Commits reached through parent links
    let mut ancestors: AHashSet<Digest> = AHashSet::new();
    let mut stack = vec![Visit {
        digest: root,
        expected: ObjectKind::Commit,
        referrer: "requested commit".to_string(),
    }];

    while let Some(visit) = stack.pop() {
        let issue = |kind, description: String| VerificationIssue {
            kind,
            object: visit.expected,
            digest: visit.digest,
            description,
        };

        if let Some(&first) = checked_as.get(&visit.digest) {
            if first != visit.expected {
                findings.file(issue(
                    IssueKind::KindMismatch,
                    format!("already checked as a {} ({})", first, visit.referrer),
                ));
            }
            continue;
        }
        checked_as.insert(visit.digest, visit.expected);
        report.objects_checked += 1;

        let record = match store.read_raw(visit.digest) {
            Ok(Some(record)) => record,
            Ok(None) => {
                findings.file(issue(
                    IssueKind::MissingObject,
                    format!("not in store ({})", visit.referrer),
                ));
                continue;
            }
            Err(e) => {
                findings.file(issue(IssueKind::Undecodable, format!("unreadable: {}", e)));
                continue;
            }
        };

        let actual = hash_bytes(&record);
        if actual != visit.digest {
            findings.file(issue(
                IssueKind::DigestMismatch,
                format!("content hashes to {} ({})", actual, visit.referrer),
            ));
        }

        let (kind, payload) = match split_record(&record) {
            Ok(split) => split,
            Err(e) => {
                findings.file(issue(IssueKind::Undecodable, e.to_string()));
                continue;
            }
        };
        if kind != visit.expected {
            findings.file(issue(
                IssueKind::KindMismatch,
                format!("record is a {} ({})", kind, visit.referrer),
            ));
            continue;
        }

        match kind {
            ObjectKind::Blob => {}
            ObjectKind::Tree => match Tree::decode(payload) {
                Ok(tree) => {
                    for entry in tree.entries() {
                        stack.push(Visit {
                            digest: entry.digest,
                            expected: entry.kind.object_kind(),
                            referrer: format!("entry {:?} of tree {}", entry.name, visit.digest.short()),
                        });
                    }
                }
                Err(e) => findings.file(issue(IssueKind::Undecodable, e.to_string())),
            },
            ObjectKind::Commit => match Commit::decode(payload) {
                Ok(commit) => {
                    report.commits_checked += 1;
                    stack.push(Visit {
                        digest: commit.tree,
                        expected: ObjectKind::Tree,
                        referrer: format!("tree of commit {}", visit.digest.short()),
                    });

                    if let (Some(parent), VerifyScope::History) = (commit.parent, scope) {
                        if parent == root || ancestors.contains(&parent) {
                            // Filed against the commit reached twice
                            findings.file(VerificationIssue {
                                kind: IssueKind::ParentCycle,
                                object: ObjectKind::Commit,
                                digest: parent,
                                description: format!(
                                    "reached again as parent of commit {}",
                                    visit.digest.short()
                                ),
                            });
                        } else {
                            ancestors.insert(parent);
                            stack.push(Visit {
                                digest: parent,
                                expected: ObjectKind::Commit,
                                referrer: format!("parent of commit {}", visit.digest.short()),
                            });
                        }
                    }
                }
                Err(e) => findings.file(issue(IssueKind::Undecodable, e.to_string())),
            },
        }
    }
    report.issues = findings.issues;

    for found in &report.issues {
        tracing::warn!(
            kind = found.kind.as_str(),
            object = found.object.as_str(),
            digest = %found.digest.short(),
            "{}",
            found.description
        );
    }
    tracing::info!(
        root = %root.short(),
        objects = report.objects_checked,
        issues = report.issues.len(),
        "verification finished"
    );
    report
}
