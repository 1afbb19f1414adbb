//! Tree objects and the staged-paths → tree builder

use crate::error::{Result, StoreError};
use crate::hash::Digest;
use crate::object::{record_digest, ObjectKind, Reader, RecordError};
use crate::store::ObjectStore;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of directory levels below the root
pub const MAX_TREE_DEPTH: usize = 128;

/// What a tree entry points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Blob,
    Tree,
}

impl EntryKind {
    fn to_byte(self) -> u8 {
        match self {
            EntryKind::Blob => 0,
            EntryKind::Tree => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, RecordError> {
        match byte {
            0 => Ok(EntryKind::Blob),
            1 => Ok(EntryKind::Tree),
            other => Err(RecordError::InvalidEntryKind(other)),
        }
    }

    /// Object kind the referenced digest must resolve to
    pub fn object_kind(self) -> ObjectKind {
        match self {
            EntryKind::Blob => ObjectKind::Blob,
            EntryKind::Tree => ObjectKind::Tree,
        }
    }
}

/// One named reference inside a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub digest: Digest,
}

impl TreeEntry {
    pub fn blob(name: impl Into<String>, digest: Digest) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Blob,
            digest,
        }
    }

    pub fn tree(name: impl Into<String>, digest: Digest) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Tree,
            digest,
        }
    }
}

/// Check a single path component
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty component");
    }
    if name == "." || name == ".." {
        return Err("relative component");
    }
    if name.contains('/') || name.contains('\0') {
        return Err("separator or NUL in component");
    }
    if name.len() > u16::MAX as usize {
        return Err("component too long");
    }
    Ok(())
}

/// A directory listing: entries sorted by name bytes, names unique
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// The tree with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a tree from entries in any order
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Result<Self, RecordError> {
        for entry in &entries {
            validate_name(&entry.name).map_err(|_| RecordError::InvalidName(entry.name.clone()))?;
        }
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        for pair in entries.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(RecordError::DuplicateName(pair[1].name.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical payload
    ///
    /// Format (little-endian):
    /// - entry_count: u32
    /// - entries, sorted by name bytes:
    ///   - name_len: u16
    ///   - name: [u8; name_len] (UTF-8)
    ///   - kind: u8 (0=blob, 1=tree)
    ///   - digest: [u8; 32]
    pub fn encode(&self) -> Vec<u8> {
        let size: usize = self.entries.iter().map(|e| 2 + e.name.len() + 1 + 32).sum();
        let mut bytes = Vec::with_capacity(4 + size);
        bytes.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            bytes.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            bytes.extend_from_slice(entry.name.as_bytes());
            bytes.push(entry.kind.to_byte());
            bytes.extend_from_slice(entry.digest.as_bytes());
        }
        bytes
    }

    /// Decode a canonical payload, rejecting anything non-canonical
    pub fn decode(payload: &[u8]) -> Result<Self, RecordError> {
        let mut reader = Reader::new(payload);
        let count = reader.u32("entry count")? as usize;

        // Every entry occupies at least 36 bytes; bound the allocation by the input.
        let mut entries: Vec<TreeEntry> = Vec::with_capacity(count.min(payload.len() / 36));
        for _ in 0..count {
            let name_len = reader.u16("name length")? as usize;
            let name = reader.utf8(name_len, "entry name")?;
            validate_name(name).map_err(|_| RecordError::InvalidName(name.to_string()))?;
            if let Some(previous) = entries.last() {
                if previous.name.as_bytes() >= name.as_bytes() {
                    return Err(RecordError::Unsorted(name.to_string()));
                }
            }
            let kind = EntryKind::from_byte(reader.u8("entry kind")?)?;
            let digest = reader.digest("entry digest")?;
            entries.push(TreeEntry {
                name: name.to_string(),
                kind,
                digest,
            });
        }
        reader.finish()?;

        Ok(Self { entries })
    }

    /// Digest of this tree's record
    pub fn digest(&self) -> Digest {
        record_digest(ObjectKind::Tree, &self.encode())
    }
}

/// Path components of a staged path, validated
fn split_components(path: &str) -> Result<SmallVec<[&str; 8]>> {
    let invalid = |reason| StoreError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(invalid("empty path"));
    }
    if path.starts_with('/') {
        return Err(invalid("absolute path"));
    }

    let mut components = SmallVec::new();
    for component in path.split('/') {
        validate_name(component).map_err(invalid)?;
        components.push(component);
    }
    if components.len() > MAX_TREE_DEPTH {
        return Err(invalid("too many components"));
    }
    Ok(components)
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn depth(dir: &str) -> usize {
    if dir.is_empty() {
        0
    } else {
        dir.matches('/').count() + 1
    }
}

#[derive(Default)]
struct DirNode {
    files: BTreeMap<String, Digest>,
    subdirs: BTreeSet<String>,
}

/// Group staged paths by directory and emit one tree per directory,
/// deepest first, returning the root digest.
fn assemble<I, P, F>(staged: I, mut emit: F) -> Result<Digest>
where
    I: IntoIterator<Item = (P, Digest)>,
    P: AsRef<str>,
    F: FnMut(&Tree) -> Result<Digest>,
{
    let mut dirs: AHashMap<String, DirNode> = AHashMap::new();
    dirs.insert(String::new(), DirNode::default());

    for (path, digest) in staged {
        let path = path.as_ref();
        let components = split_components(path)?;
        let Some((file_name, parents)) = components.split_last() else {
            continue;
        };

        let mut dir = String::new();
        for &component in parents {
            let child = join(&dir, component);
            let node = dirs.entry(dir).or_default();
            if node.files.contains_key(component) {
                return Err(StoreError::PathConflict(child));
            }
            node.subdirs.insert(component.to_string());
            dir = child;
        }

        let node = dirs.entry(dir).or_default();
        if node.subdirs.contains(*file_name) {
            return Err(StoreError::PathConflict(path.to_string()));
        }
        if let Some(previous) = node.files.insert(file_name.to_string(), digest) {
            if previous != digest {
                return Err(StoreError::PathConflict(path.to_string()));
            }
        }
    }

    let mut order: Vec<String> = dirs.keys().cloned().collect();
    order.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));

    let mut built: AHashMap<String, Digest> = AHashMap::with_capacity(order.len());
    for dir in order {
        let Some(node) = dirs.remove(&dir) else {
            continue;
        };

        let mut entries = Vec::with_capacity(node.files.len() + node.subdirs.len());
        for (name, digest) in node.files {
            entries.push(TreeEntry::blob(name, digest));
        }
        for name in node.subdirs {
            let child = join(&dir, &name);
            // Children are one level deeper and therefore already built.
            let digest = built
                .remove(&child)
                .ok_or_else(|| StoreError::PathConflict(child.clone()))?;
            entries.push(TreeEntry::tree(name, digest));
        }

        let tree = Tree::from_entries(entries).map_err(|_| StoreError::InvalidPath {
            path: dir.clone(),
            reason: "directory listing is not canonical",
        })?;
        let digest = emit(&tree)?;
        built.insert(dir, digest);
    }

    built
        .remove("")
        .ok_or_else(|| StoreError::PathConflict(String::new()))
}

/// Converts a staged path set into a stored tree graph
pub struct TreeBuilder<'s> {
    store: &'s ObjectStore,
}

impl<'s> TreeBuilder<'s> {
    pub fn new(store: &'s ObjectStore) -> Self {
        Self { store }
    }

    /// Store one tree per directory for `path → blob digest` pairs and
    /// return the root tree digest.
    ///
    /// The result depends only on the set of pairs, never on their order.
    /// An empty set yields the empty tree.
    pub fn build<I, P>(&self, staged: I) -> Result<Digest>
    where
        I: IntoIterator<Item = (P, Digest)>,
        P: AsRef<str>,
    {
        assemble(staged, |tree| self.store.put_tree(tree))
    }

    /// Store file contents as blobs, then build their tree
    pub fn build_from_contents<I, P, B>(&self, files: I) -> Result<Digest>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let mut staged = Vec::new();
        for (path, content) in files {
            let digest = self.store.put_blob(content.as_ref())?;
            staged.push((path.as_ref().to_string(), digest));
        }
        self.build(staged)
    }
}

/// Root digest `TreeBuilder::build` would produce, computed without writing
pub fn compute_root<I, P>(staged: I) -> Result<Digest>
where
    I: IntoIterator<Item = (P, Digest)>,
    P: AsRef<str>,
{
    assemble(staged, |tree| Ok(tree.digest()))
}

/// Every file reachable from `root`, as `path → blob digest`
pub fn flatten(store: &ObjectStore, root: Digest) -> Result<BTreeMap<String, Digest>> {
    let mut files = BTreeMap::new();
    let mut stack: Vec<(String, Digest, usize)> = vec![(String::new(), root, 0)];

    while let Some((prefix, digest, level)) = stack.pop() {
        let tree = store.read_tree(digest)?;
        for entry in tree.entries() {
            let path = join(&prefix, &entry.name);
            match entry.kind {
                EntryKind::Blob => {
                    files.insert(path, entry.digest);
                }
                EntryKind::Tree => {
                    if level + 1 > MAX_TREE_DEPTH {
                        return Err(StoreError::TreeTooDeep(entry.digest));
                    }
                    stack.push((path, entry.digest, level + 1));
                }
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use rand::seq::SliceRandom;

    fn open_store() -> (tempfile::TempDir, ObjectStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(temp_dir.path().join("objects"), temp_dir.path().join("tmp"));
        (temp_dir, store)
    }

    #[test]
    fn test_from_entries_sorts_by_name() {
        let d = hash_bytes(b"x");
        let tree = Tree::from_entries(vec![
            TreeEntry::blob("b.txt", d),
            TreeEntry::tree("a", d),
            TreeEntry::blob("C", d),
        ])
        .unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["C", "a", "b.txt"]);
        assert_eq!(tree.get("a").map(|e| e.kind), Some(EntryKind::Tree));
        assert!(tree.get("missing").is_none());
    }

    #[test]
    fn test_from_entries_rejects_duplicates_and_bad_names() {
        let d = hash_bytes(b"x");
        let dup = Tree::from_entries(vec![TreeEntry::blob("a", d), TreeEntry::tree("a", d)]);
        assert_eq!(dup, Err(RecordError::DuplicateName("a".into())));

        for bad in ["", ".", "..", "a/b"] {
            assert!(Tree::from_entries(vec![TreeEntry::blob(bad, d)]).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_tree_encoding_roundtrip() {
        let tree = Tree::from_entries(vec![
            TreeEntry::blob("README.md", hash_bytes(b"readme")),
            TreeEntry::tree("src", hash_bytes(b"src")),
        ])
        .unwrap();
        assert_eq!(Tree::decode(&tree.encode()).unwrap(), tree);
    }

    #[test]
    fn test_decode_rejects_unsorted_payload() {
        let d = hash_bytes(b"x");
        let mut payload = 2u32.to_le_bytes().to_vec();
        for name in ["b", "a"] {
            payload.extend_from_slice(&1u16.to_le_bytes());
            payload.extend_from_slice(name.as_bytes());
            payload.push(0);
            payload.extend_from_slice(d.as_bytes());
        }
        assert_eq!(Tree::decode(&payload), Err(RecordError::Unsorted("a".into())));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut payload = Tree::empty().encode();
        payload.push(0);
        assert_eq!(Tree::decode(&payload), Err(RecordError::TrailingBytes(1)));
    }

    #[test]
    fn test_empty_stage_builds_empty_tree() {
        let (_dir, store) = open_store();
        let root = TreeBuilder::new(&store)
            .build(Vec::<(String, Digest)>::new())
            .unwrap();
        assert_eq!(root, Tree::empty().digest());
        assert!(store.read_tree(root).unwrap().is_empty());
    }

    #[test]
    fn test_build_is_order_independent() {
        let (_dir, store) = open_store();
        let mut staged: Vec<(String, Digest)> = [
            "a.txt", "src/main.rs", "src/lib.rs", "src/util/mod.rs", "docs/guide/intro.md", "z",
        ]
        .iter()
        .map(|p| (p.to_string(), hash_bytes(p.as_bytes())))
        .collect();

        let expected = TreeBuilder::new(&store).build(staged.clone()).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            staged.shuffle(&mut rng);
            assert_eq!(TreeBuilder::new(&store).build(staged.clone()).unwrap(), expected);
        }
    }

    #[test]
    fn test_build_nests_directories() {
        let (_dir, store) = open_store();
        let root = TreeBuilder::new(&store)
            .build_from_contents([("a.txt", "hello"), ("dir/b.txt", "world")])
            .unwrap();

        let tree = store.read_tree(root).unwrap();
        assert_eq!(tree.len(), 2);
        let dir = tree.get("dir").unwrap();
        assert_eq!(dir.kind, EntryKind::Tree);
        let sub = store.read_tree(dir.digest).unwrap();
        assert_eq!(sub.get("b.txt").unwrap().digest, store.put_blob(b"world").unwrap());
    }

    #[test]
    fn test_compute_root_matches_build() {
        let (_dir, store) = open_store();
        let staged = vec![
            ("x/y/z.txt".to_string(), hash_bytes(b"1")),
            ("x/w.txt".to_string(), hash_bytes(b"2")),
        ];
        let computed = compute_root(staged.clone()).unwrap();
        let built = TreeBuilder::new(&store).build(staged).unwrap();
        assert_eq!(computed, built);
    }

    #[test]
    fn test_path_conflict_detected_in_either_order() {
        let d = hash_bytes(b"x");
        let err = compute_root(vec![("a", d), ("a/b", d)]).unwrap_err();
        assert_eq!(err.category(), "path-conflict");
        let err = compute_root(vec![("a/b", d), ("a", d)]).unwrap_err();
        assert_eq!(err.category(), "path-conflict");
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let d = hash_bytes(b"x");
        for bad in ["", "/abs", "a//b", "a/../b", "./a", "a/"] {
            let err = compute_root(vec![(bad, d)]).unwrap_err();
            assert_eq!(err.category(), "invalid-path", "{bad:?}");
        }
    }

    #[test]
    fn test_flatten_lists_every_file() {
        let (_dir, store) = open_store();
        let root = TreeBuilder::new(&store)
            .build_from_contents([("a.txt", "1"), ("d/b.txt", "2"), ("d/e/c.txt", "3")])
            .unwrap();
        let files = flatten(&store, root).unwrap();
        let paths: Vec<_> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["a.txt", "d/b.txt", "d/e/c.txt"]);
    }
}
