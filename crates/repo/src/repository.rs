//! Repository context
//!
//! A [`Repository`] owns the layout, config and object store of one
//! `.mgit/` directory and is passed explicitly to every operation.

use crate::checkout::{self, CheckoutSummary};
use crate::config::Config;
use crate::error::RepoError;
use crate::verify::{self, VerificationReport, VerifyScope};
use crate::Result;
use journal::layout::REPO_DIR;
use journal::{CommitChain, Index, Layout, Refs, RepoLock, RevocationRegistry};
use mgit_core::hash::hash_file;
use mgit_core::store::normalize_path;
use mgit_core::tree::compute_root;
use mgit_core::{Commit, Digest, ObjectKind, ObjectStore, StoreError, Tree, TreeBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Minimum length of an abbreviated digest
pub const MIN_PREFIX_LEN: usize = 4;

pub struct Repository {
    layout: Layout,
    config: Config,
    store: ObjectStore,
}

/// Snapshot of staged state against HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub head: Option<Digest>,
    pub staged_paths: Vec<String>,
    /// Whether the current contents of the staged files rebuild HEAD's tree
    /// (`None` before the first commit)
    pub working_tree_matches_head: Option<bool>,
    /// Staged files whose contents changed since they were staged
    pub modified: Vec<String>,
    /// Staged files no longer present in the working tree
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub digest: Digest,
    pub commit: Commit,
    pub revoked: bool,
}

/// Decoded view of any stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectView {
    Blob(Vec<u8>),
    Tree(Arc<Tree>),
    Commit(Commit),
}

impl ObjectView {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectView::Blob(_) => ObjectKind::Blob,
            ObjectView::Tree(_) => ObjectKind::Tree,
            ObjectView::Commit(_) => ObjectKind::Commit,
        }
    }
}

impl Repository {
    /// Create a new repository in `root`
    ///
    /// Creates the `.mgit/` structure:
    /// ```text
    /// .mgit/
    ///   config.toml
    ///   HEAD
    ///   index
    ///   revoked.log
    ///   locks/
    ///   objects/
    ///   tmp/
    /// ```
    pub fn init(root: &Path) -> Result<Self> {
        let layout = Layout::new(root);
        if layout.repo_dir().exists() {
            return Err(RepoError::AlreadyInitialized(layout.repo_dir().to_path_buf()));
        }

        for dir in [layout.objects_dir(), layout.tmp_dir(), layout.locks_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| RepoError::io(&dir, e))?;
        }

        let config = Config::default();
        config.save(&layout.config_path(), &layout.tmp_dir())?;
        Refs::new(&layout).clear()?;
        Index::new().save(&layout.index_path(), &layout.tmp_dir(), config.store.fsync)?;
        let revoked = layout.revoked_path();
        std::fs::File::create(&revoked).map_err(|e| RepoError::io(&revoked, e))?;

        tracing::info!(path = %layout.repo_dir().display(), "initialized repository");
        Self::open(root)
    }

    /// Open an existing repository rooted at `root`
    pub fn open(root: &Path) -> Result<Self> {
        let layout = Layout::new(root);
        if !layout.repo_dir().is_dir() || !layout.objects_dir().is_dir() {
            return Err(RepoError::NotInitialized(root.to_path_buf()));
        }

        let config = Config::load(&layout.config_path())?;
        let store = layout.object_store(config.store.fsync);
        Ok(Self {
            layout,
            config,
            store,
        })
    }

    /// Find the repository containing `start` by walking up its ancestors
    pub fn discover(start: &Path) -> Result<Self> {
        for dir in start.ancestors() {
            if dir.join(REPO_DIR).is_dir() {
                tracing::debug!(root = %dir.display(), "discovered repository");
                return Self::open(dir);
            }
        }
        Err(RepoError::NotInitialized(start.to_path_buf()))
    }

    pub fn work_root(&self) -> &Path {
        self.layout.work_root()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    fn fsync(&self) -> bool {
        self.config.store.fsync
    }

    fn refs(&self) -> Refs {
        Refs::new(&self.layout).with_fsync(self.fsync())
    }

    fn chain(&self) -> CommitChain<'_> {
        CommitChain::new(&self.store, &self.layout)
            .with_author(self.config.author())
            .with_refs(self.refs())
    }

    fn registry(&self) -> RevocationRegistry<'_> {
        RevocationRegistry::new(&self.store, &self.layout).with_fsync(self.fsync())
    }

    pub fn head(&self) -> Result<Option<Digest>> {
        Ok(self.refs().head()?)
    }

    /// Stage files (directories are expanded recursively)
    ///
    /// Relative paths are taken from the working tree root. Returns the
    /// staged `(path, blob digest)` pairs in order.
    pub fn stage<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<(String, Digest)>> {
        let _lock = RepoLock::exclusive(&self.layout.lock_path())?;
        let index_path = self.layout.index_path();
        let mut index = Index::load(&index_path)?;
        let mut staged = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.work_root().join(path)
            };

            for file in self.expand(&absolute)? {
                let relative = self.relative_path(&file)?;
                let digest = self.store_file(&file)?;
                tracing::debug!(path = %relative, blob = %digest.short(), "staged");
                index.insert(relative.clone(), digest);
                staged.push((relative, digest));
            }
        }

        index.save(&index_path, &self.layout.tmp_dir(), self.fsync())?;
        tracing::info!(files = staged.len(), "staged files");
        Ok(staged)
    }

    /// Regular files at or below `path`, skipping the repository directory
    fn expand(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let metadata = std::fs::metadata(path).map_err(|e| RepoError::io(path, e))?;
        if !metadata.is_dir() {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != REPO_DIR);
        for entry in walker {
            let entry = entry.map_err(|e| {
                let at = e.path().unwrap_or(path).to_path_buf();
                RepoError::io(at, e.into())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Normalized `/` path relative to the working tree root
    fn relative_path(&self, file: &Path) -> Result<String> {
        let display = file.display().to_string();
        let relative = file
            .strip_prefix(self.work_root())
            .map_err(|_| StoreError::InvalidPath {
                path: display.clone(),
                reason: "outside the working tree",
            })?;
        let normalized = normalize_path(relative)?;
        if normalized == REPO_DIR || normalized.starts_with(&format!("{}/", REPO_DIR)) {
            return Err(StoreError::InvalidPath {
                path: display,
                reason: "inside the repository directory",
            }
            .into());
        }
        Ok(normalized)
    }

    /// Store one file as a blob, memory-mapping large files
    fn store_file(&self, file: &Path) -> Result<Digest> {
        let handle = std::fs::File::open(file).map_err(|e| RepoError::io(file, e))?;
        let len = handle.metadata().map_err(|e| RepoError::io(file, e))?.len();

        if len > 0 && len >= self.config.store.mmap_threshold {
            // SAFETY: the mapping is read-only and dropped before returning
            let mmap = unsafe { memmap2::Mmap::map(&handle) }.map_err(|e| RepoError::io(file, e))?;
            Ok(self.store.put_blob(&mmap)?)
        } else {
            let content = std::fs::read(file).map_err(|e| RepoError::io(file, e))?;
            Ok(self.store.put_blob(&content)?)
        }
    }

    /// Commit the index on top of HEAD
    ///
    /// An empty index commits the empty tree.
    pub fn commit_staged(&self, message: &str) -> Result<Digest> {
        let index = Index::load(&self.layout.index_path())?;
        let tree = TreeBuilder::new(&self.store).build(index.iter())?;
        let chain = self.chain();
        let parent = chain.head()?;
        Ok(chain.commit(tree, message, parent)?)
    }

    pub fn status(&self) -> Result<Status> {
        let _lock = RepoLock::shared(&self.layout.lock_path())?;
        let head = self.refs().head()?;
        let index = Index::load(&self.layout.index_path())?;

        let mut current = Vec::with_capacity(index.len());
        let mut modified = Vec::new();
        let mut missing = Vec::new();
        for (path, staged) in index.iter() {
            let file = self.work_root().join(path);
            if !file.is_file() {
                missing.push(path.to_string());
                continue;
            }
            let digest = hash_file(&ObjectKind::Blob.magic(), &file)
                .map_err(|e| RepoError::io(&file, e))?;
            if digest != staged {
                modified.push(path.to_string());
            }
            current.push((path, digest));
        }

        let working_tree_matches_head = match head {
            Some(head) => {
                let head_tree = self.store.read_commit(head)?.tree;
                Some(compute_root(current)? == head_tree)
            }
            None => None,
        };

        Ok(Status {
            head,
            staged_paths: index.paths().map(str::to_string).collect(),
            working_tree_matches_head,
            modified,
            missing,
        })
    }

    /// History from HEAD, newest first, at most `limit` entries
    pub fn log(&self, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        let Some(head) = self.head()? else {
            return Ok(Vec::new());
        };
        let revoked = self.registry().revoked_set()?;

        let mut entries = Vec::new();
        for item in self.chain().history(head).take(limit.unwrap_or(usize::MAX)) {
            let (digest, commit) = item?;
            entries.push(LogEntry {
                digest,
                revoked: revoked.contains(&digest),
                commit,
            });
        }
        Ok(entries)
    }

    /// Read and decode any object
    pub fn cat_object(&self, digest: Digest) -> Result<ObjectView> {
        Ok(match self.store.kind_of(digest)? {
            ObjectKind::Blob => ObjectView::Blob(self.store.read_blob(digest)?),
            ObjectKind::Tree => ObjectView::Tree(self.store.read_tree(digest)?),
            ObjectKind::Commit => ObjectView::Commit(self.store.read_commit(digest)?),
        })
    }

    /// Resolve `HEAD`, a full digest, or a unique prefix of at least four hex characters
    pub fn resolve(&self, reference: &str) -> Result<Digest> {
        let reference = reference.trim();
        if reference.eq_ignore_ascii_case("HEAD") {
            return self.head()?.ok_or(RepoError::NoHead);
        }

        let lower = reference.to_ascii_lowercase();
        if let Ok(digest) = Digest::from_hex(&lower) {
            return Ok(digest);
        }
        if lower.len() < MIN_PREFIX_LEN || !lower.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RepoError::UnknownReference(reference.to_string()));
        }

        let matches: Vec<Digest> = self
            .store
            .list()?
            .into_iter()
            .filter(|digest| digest.to_hex().starts_with(&lower))
            .collect();
        match matches.as_slice() {
            [digest] => Ok(*digest),
            [] => Err(RepoError::UnknownReference(reference.to_string())),
            _ => Err(RepoError::AmbiguousReference {
                prefix: reference.to_string(),
                count: matches.len(),
            }),
        }
    }

    /// Verify a commit and, depending on `scope`, its ancestors
    pub fn verify(&self, commit: Digest, scope: VerifyScope) -> Result<VerificationReport> {
        let _lock = RepoLock::shared(&self.layout.lock_path())?;
        Ok(verify::verify(&self.store, commit, scope))
    }

    /// Permanently block checkout of `commit`; `false` if already revoked
    pub fn revoke(&self, commit: Digest) -> Result<bool> {
        Ok(self.registry().revoke(commit)?)
    }

    pub fn is_revoked(&self, commit: Digest) -> Result<bool> {
        Ok(self.registry().is_revoked(commit)?)
    }

    /// Write the tree of `commit` into `target` (HEAD does not move)
    pub fn checkout(&self, commit: Digest, target: &Path) -> Result<CheckoutSummary> {
        let _lock = RepoLock::shared(&self.layout.lock_path())?;

        match self.store.kind_of(commit) {
            Ok(ObjectKind::Commit) => {}
            Ok(_) | Err(StoreError::ObjectNotFound(_)) => {
                return Err(RepoError::UnknownCommit(commit))
            }
            Err(e) => return Err(e.into()),
        }
        if self.registry().is_revoked(commit)? {
            tracing::warn!(commit = %commit.short(), "refusing checkout of revoked commit");
            return Err(RepoError::RevokedCommit(commit));
        }

        checkout::materialize(&self.store, commit, target, self.fsync())
    }
}
