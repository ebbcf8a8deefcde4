// Items in this module are only used in test code.

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::access::{EntryMode, ObjectId, RepoAccess, TreeEntry};
use crate::error::{Error, Result};

/// In-memory repository for scanner and dispatcher tests.
///
/// Object ids are handed out sequentially. Individual blobs can be marked
/// unreadable to exercise per-entry failure handling.
#[derive(Debug, Default)]
pub(crate) struct MemoryRepo {
    pub bare: bool,
    pub branches: Vec<String>,
    pub head: Option<ObjectId>,
    pub commits: HashMap<ObjectId, ObjectId>,
    pub trees: HashMap<ObjectId, Vec<TreeEntry>>,
    pub blobs: HashMap<ObjectId, Vec<u8>>,
    pub unreadable: HashSet<ObjectId>,
    /// Number of `open_blob` calls, shared so tests can read it after the
    /// repository has been moved.
    pub opens: Arc<AtomicUsize>,
    next_id: u32,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId::from_bytes(&self.next_id.to_be_bytes())
    }

    pub fn add_blob(&mut self, content: &[u8]) -> ObjectId {
        let id = self.next_id();
        self.blobs.insert(id.clone(), content.to_vec());
        id
    }

    pub fn add_tree(&mut self, entries: Vec<TreeEntry>) -> ObjectId {
        let id = self.next_id();
        self.trees.insert(id.clone(), entries);
        id
    }

    /// Commit `root` and point HEAD at it.
    pub fn commit(&mut self, root: ObjectId) -> ObjectId {
        let id = self.next_id();
        self.commits.insert(id.clone(), root);
        self.head = Some(id.clone());
        id
    }

    pub fn file(&mut self, name: &str, content: &[u8]) -> TreeEntry {
        let id = self.add_blob(content);
        TreeEntry::new(name, EntryMode::Regular, id)
    }

    pub fn symlink(&mut self, name: &str, target: &str) -> TreeEntry {
        let id = self.add_blob(target.as_bytes());
        TreeEntry::new(name, EntryMode::Symlink, id)
    }

    pub fn dir(&mut self, name: &str, entries: Vec<TreeEntry>) -> TreeEntry {
        let id = self.add_tree(entries);
        TreeEntry::new(name, EntryMode::Tree, id)
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("simulated read failure"))
    }
}

impl RepoAccess for MemoryRepo {
    fn is_bare(&self) -> bool {
        self.bare
    }

    fn branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.clone())
    }

    fn head(&self) -> Result<ObjectId> {
        self.head
            .clone()
            .ok_or_else(|| Error::Git(git2::Error::from_str("reference 'HEAD' is unborn")))
    }

    fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId> {
        self.commits
            .get(commit)
            .cloned()
            .ok_or_else(|| Error::NotFound(commit.clone()))
    }

    fn tree_entries(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>> {
        self.trees
            .get(tree)
            .cloned()
            .ok_or_else(|| Error::NotFound(tree.clone()))
    }

    fn blob_size(&self, blob: &ObjectId) -> Result<u64> {
        self.blobs
            .get(blob)
            .map(|b| b.len() as u64)
            .ok_or_else(|| Error::NotFound(blob.clone()))
    }

    fn open_blob(&self, blob: &ObjectId) -> Result<Box<dyn Read + '_>> {
        self.opens.fetch_add(1, Ordering::Relaxed);
        if self.unreadable.contains(blob) {
            return Ok(Box::new(FailingReader));
        }
        let data = self
            .blobs
            .get(blob)
            .ok_or_else(|| Error::NotFound(blob.clone()))?;
        Ok(Box::new(Cursor::new(data.as_slice())))
    }
}
