//! Missing annex content detection
//!
//! Walks the tree at HEAD of one repository, classifies every blob-backed
//! entry and, for each pointer, probes the annex object store for the
//! content. Works on bare repositories because it never looks at a working
//! tree.
//!
//! Failures are contained: a repository whose HEAD cannot be resolved yields
//! no records, and an unreadable entry is skipped while the walk continues.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::access::{EntryMode, ObjectId, RepoAccess, TreeEntry};
use crate::locator::{hash_dir_lower, hash_dir_mixed};
use crate::pointer::{ContentKey, MAX_POINTER_SIZE, classify_blob};
use crate::repository::{MissingContent, Repository};

/// Name of the metadata directory in repositories with a working tree.
pub const GIT_DIR_NAME: &str = ".git";

/// Scans repositories for annexed files whose content is missing.
#[derive(Debug, Clone)]
pub struct Scanner {
    git_dir_name: String,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            git_dir_name: GIT_DIR_NAME.to_string(),
        }
    }
}

/// Per-repository state for one tree walk
struct Walk<'a> {
    access: &'a dyn RepoAccess,
    repo_path: &'a Path,
    object_store: PathBuf,
    missing: Vec<MissingContent>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of the annex object store of a repository.
    pub fn object_store(&self, repo_path: &Path, bare: bool) -> PathBuf {
        let git_dir = if bare {
            repo_path.to_path_buf()
        } else {
            repo_path.join(&self.git_dir_name)
        };
        git_dir.join("annex").join("objects")
    }

    /// Scan `repo` and store the result on it.
    pub fn scan(&self, repo: &mut Repository) {
        let missing = self.find_missing_content(repo);
        repo.set_missing_content(missing);
    }

    /// Collect every annexed file at HEAD whose content is absent.
    pub fn find_missing_content(&self, repo: &Repository) -> Vec<MissingContent> {
        let access = repo.access();
        let repo_path = repo.path();

        let head = match access.head() {
            Ok(head) => head,
            Err(e) => {
                error!(repo = %repo_path.display(), "Failed to get HEAD: {}", e);
                return Vec::new();
            }
        };

        let root = match access.commit_tree(&head) {
            Ok(root) => root,
            Err(e) => {
                error!(repo = %repo_path.display(), commit = %head, "Failed to get HEAD commit: {}", e);
                return Vec::new();
            }
        };

        let entries = match access.tree_entries(&root) {
            Ok(entries) => entries,
            Err(e) => {
                error!(repo = %repo_path.display(), tree = %root, "Failed to get root HEAD tree: {}", e);
                return Vec::new();
            }
        };

        let mut walk = Walk {
            access,
            repo_path,
            object_store: self.object_store(repo_path, access.is_bare()),
            missing: Vec::new(),
        };
        walk.visit(entries, "");

        debug!(
            repo = %repo_path.display(),
            missing = walk.missing.len(),
            "Scan finished"
        );
        walk.missing
    }
}

impl Walk<'_> {
    /// Depth-first, pre-order over `entries` and everything below them.
    fn visit(&mut self, entries: Vec<TreeEntry>, prefix: &str) {
        for entry in entries {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", prefix, entry.name)
            };

            match entry.mode {
                EntryMode::Tree => match self.access.tree_entries(&entry.id) {
                    Ok(children) => self.visit(children, &path),
                    Err(e) => {
                        error!(
                            repo = %self.repo_path.display(),
                            tree = %entry.id,
                            "Failed to read tree {:?}: {}", path, e
                        );
                    }
                },
                mode if mode.is_file_like() => self.check_blob(&entry.id, path),
                _ => {}
            }
        }
    }

    fn check_blob(&mut self, id: &ObjectId, tree_path: String) {
        let Some(key) = self.read_pointer(id, &tree_path) else {
            return;
        };

        if let Some(object_path) = locate_missing(&self.object_store, &key) {
            debug!(
                repo = %self.repo_path.display(),
                key = %key,
                "Missing content for {:?}", tree_path
            );
            self.missing.push(MissingContent {
                tree_path,
                object_path,
            });
        }
    }

    fn read_pointer(&self, id: &ObjectId, tree_path: &str) -> Option<ContentKey> {
        let size = match self.access.blob_size(id) {
            Ok(size) => size,
            Err(e) => {
                error!(
                    repo = %self.repo_path.display(),
                    blob = %id,
                    "Failed to get blob for {:?}: {}", tree_path, e
                );
                return None;
            }
        };
        if size == 0 || size > MAX_POINTER_SIZE {
            return None;
        }

        let mut reader = match self.access.open_blob(id) {
            Ok(reader) => reader,
            Err(e) => {
                error!(
                    repo = %self.repo_path.display(),
                    blob = %id,
                    "Failed to open blob for {:?}: {}", tree_path, e
                );
                return None;
            }
        };

        match classify_blob(size, reader.as_mut()) {
            Ok(key) => key,
            Err(e) => {
                error!(
                    repo = %self.repo_path.display(),
                    blob = %id,
                    "Failed to read contents of blob for {:?}: {}", tree_path, e
                );
                None
            }
        }
    }
}

/// Probe both hash layouts for `key`; mixed first, then lower.
///
/// Returns the lower-layout path when neither exists.
pub fn locate_missing(object_store: &Path, key: &ContentKey) -> Option<PathBuf> {
    let mixed = object_store.join(hash_dir_mixed(key.as_bytes()));
    if !is_absent(&mixed) {
        return None;
    }

    let lower = object_store.join(hash_dir_lower(key.as_bytes()));
    if !is_absent(&lower) {
        return None;
    }

    Some(lower)
}

// Only a definite not-found counts as absent.
fn is_absent(path: &Path) -> bool {
    matches!(fs::metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}
