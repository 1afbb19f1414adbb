//! On-disk, content-addressed object store
//!
//! Layout under the objects directory:
//! ```text
//! objects/
//!   <hh>/<remaining 62 hex chars>    one immutable record per digest
//! ```
//! Writes are staged in a sibling `tmp/` directory, fsynced and renamed into
//! place, so a crash never leaves a partial record under a digest. There is
//! no update or delete operation.

use crate::commit::Commit;
use crate::error::{Result, StoreError};
use crate::hash::{hash_bytes, Digest};
use crate::object::{record_digest, split_record, ObjectKind, RecordError, RECORD_HEADER_LEN};
use crate::tree::Tree;
use dashmap::DashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Content-addressed store for blob, tree and commit records
pub struct ObjectStore {
    /// Root of the fan-out directories
    objects_dir: PathBuf,
    /// Staging area for atomic writes (same filesystem as `objects_dir`)
    tmp_dir: PathBuf,
    /// Whether to fsync records and their directories
    fsync: bool,
    /// Decoded trees (hash -> tree); records are immutable
    tree_cache: DashMap<Digest, Arc<Tree>>,
}

impl ObjectStore {
    pub fn new(objects_dir: PathBuf, tmp_dir: PathBuf) -> Self {
        Self {
            objects_dir,
            tmp_dir,
            fsync: true,
            tree_cache: DashMap::new(),
        }
    }

    /// Toggle durability barriers (tests and throwaway stores may skip them)
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Filesystem path of the record for `digest`
    pub fn object_path(&self, digest: &Digest) -> PathBuf {
        // Fan-out structure: objects/<hh>/<rest>
        let hex = digest.to_hex();
        let (prefix, rest) = hex.split_at(2);
        self.objects_dir.join(prefix).join(rest)
    }

    /// Store `payload` as an object of `kind` and return its digest
    ///
    /// Idempotent: if the record already exists nothing is written.
    pub fn put(&self, kind: ObjectKind, payload: &[u8]) -> Result<Digest> {
        let digest = record_digest(kind, payload);
        let path = self.object_path(&digest);

        if path.exists() {
            return Ok(digest);
        }

        let mut record = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
        record.extend_from_slice(&kind.magic());
        record.extend_from_slice(payload);

        atomic_write(&self.tmp_dir, &path, &record, self.fsync)
            .map_err(|source| StoreError::StoreWriteError { digest, source })?;

        tracing::debug!(%digest, kind = %kind, bytes = record.len(), "stored object");
        Ok(digest)
    }

    /// Read the payload of `digest`, which must be a `expected` object
    ///
    /// The record is re-hashed on every read; a record whose bytes no longer
    /// match its digest is reported as corrupt.
    pub fn get(&self, digest: Digest, expected: ObjectKind) -> Result<Vec<u8>> {
        let record = self
            .read_raw(digest)?
            .ok_or(StoreError::ObjectNotFound(digest))?;

        let (actual, _) = split_record(&record)
            .map_err(|source| StoreError::CorruptObject { digest, source })?;
        if actual != expected {
            return Err(StoreError::ObjectKindMismatch {
                digest,
                expected,
                actual,
            });
        }

        let computed = hash_bytes(&record);
        if computed != digest {
            return Err(StoreError::CorruptObject {
                digest,
                source: RecordError::DigestMismatch { actual: computed },
            });
        }

        let mut payload = record;
        payload.drain(..RECORD_HEADER_LEN);
        Ok(payload)
    }

    /// Existence check; never fails
    pub fn contains(&self, digest: Digest) -> bool {
        self.tree_cache.contains_key(&digest) || self.object_path(&digest).is_file()
    }

    /// The stored record bytes, unchecked; `None` if absent
    pub fn read_raw(&self, digest: Digest) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(&digest);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Kind recorded in the header of `digest`
    pub fn kind_of(&self, digest: Digest) -> Result<ObjectKind> {
        let record = self
            .read_raw(digest)?
            .ok_or(StoreError::ObjectNotFound(digest))?;
        split_record(&record)
            .map(|(kind, _)| kind)
            .map_err(|source| StoreError::CorruptObject { digest, source })
    }

    pub fn put_blob(&self, content: &[u8]) -> Result<Digest> {
        self.put(ObjectKind::Blob, content)
    }

    pub fn read_blob(&self, digest: Digest) -> Result<Vec<u8>> {
        self.get(digest, ObjectKind::Blob)
    }

    pub fn put_tree(&self, tree: &Tree) -> Result<Digest> {
        let digest = self.put(ObjectKind::Tree, &tree.encode())?;
        self.tree_cache
            .entry(digest)
            .or_insert_with(|| Arc::new(tree.clone()));
        Ok(digest)
    }

    /// Read a tree, consulting the in-process cache first
    pub fn read_tree(&self, digest: Digest) -> Result<Arc<Tree>> {
        if let Some(cached) = self.tree_cache.get(&digest) {
            return Ok(Arc::clone(&cached));
        }

        let payload = self.get(digest, ObjectKind::Tree)?;
        let tree = Arc::new(
            Tree::decode(&payload).map_err(|source| StoreError::CorruptObject { digest, source })?,
        );
        self.tree_cache.insert(digest, Arc::clone(&tree));
        Ok(tree)
    }

    pub fn put_commit(&self, commit: &Commit) -> Result<Digest> {
        let payload = commit.encode().map_err(StoreError::Unencodable)?;
        self.put(ObjectKind::Commit, &payload)
    }

    pub fn read_commit(&self, digest: Digest) -> Result<Commit> {
        let payload = self.get(digest, ObjectKind::Commit)?;
        Commit::decode(&payload).map_err(|source| StoreError::CorruptObject { digest, source })
    }

    /// Every digest present in the store (order unspecified)
    pub fn list(&self) -> Result<Vec<Digest>> {
        let mut digests = Vec::new();
        let fanout = match fs::read_dir(&self.objects_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(digests),
            Err(e) => return Err(StoreError::io(&self.objects_dir, e)),
        };

        for prefix in fanout {
            let prefix = prefix.map_err(|e| StoreError::io(&self.objects_dir, e))?;
            let prefix_name = prefix.file_name().to_string_lossy().into_owned();
            if prefix_name.len() != 2 || !prefix.path().is_dir() {
                continue;
            }
            let entries = fs::read_dir(prefix.path()).map_err(|e| StoreError::io(prefix.path(), e))?;
            for entry in entries {
                let entry = entry.map_err(|e| StoreError::io(prefix.path(), e))?;
                let name = entry.file_name();
                let hex = format!("{}{}", prefix_name, name.to_string_lossy());
                if let Ok(digest) = Digest::from_hex(&hex) {
                    digests.push(digest);
                }
            }
        }

        Ok(digests)
    }
}

/// Atomic write helper
///
/// Writes data to a uniquely named file in `tmp_dir`, optionally fsyncs it,
/// renames it over `target` and fsyncs the target's directory.
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8], fsync: bool) -> io::Result<()> {
    fs::create_dir_all(tmp_dir)?;
    let temp_path = tmp_dir.join(uuid::Uuid::new_v4().to_string());

    let result = (|| {
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(data)?;
        if fsync {
            temp_file.sync_all()?;
        }
        drop(temp_file);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        // Rename to target (atomic on POSIX systems)
        fs::rename(&temp_path, target)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
        return result;
    }

    if fsync {
        if let Some(parent) = target.parent() {
            if let Ok(dir) = fs::File::open(parent) {
                let _ = dir.sync_all(); // Best effort, may fail on some filesystems
            }
        }
    }

    Ok(())
}

/// Normalize a relative path for storage
///
/// - Joins components with `/`
/// - Rejects `..`, absolute paths and non-UTF-8 names
/// - Drops `.` components
pub fn normalize_path(path: &Path) -> Result<String> {
    let display = path.to_string_lossy().into_owned();
    let invalid = |reason| StoreError::InvalidPath {
        path: display.clone(),
        reason,
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| invalid("not valid UTF-8"))?;
                // Backslashes only reach here from foreign paths on POSIX hosts
                for piece in name.split('\\') {
                    if !piece.is_empty() {
                        parts.push(piece);
                    }
                }
            }
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("path traversal not allowed")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("absolute paths not allowed"))
            }
        }
    }

    if parts.is_empty() {
        return Err(invalid("empty path"));
    }
    Ok(parts.join("/"))
}
