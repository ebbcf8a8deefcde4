//! On-disk repository access backed by libgit2
//!
//! Works for both bare repositories and repositories with a working tree.
//! Only reads are performed; nothing here modifies a repository.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use git2::{BranchType, ObjectType, Oid, RepositoryOpenFlags};

use crate::access::{EntryMode, ObjectId, RepoAccess, TreeEntry};
use crate::error::{Error, Result};

/// Implementation of [`RepoAccess`] for a repository on the local file system.
pub struct GitRepo {
    inner: git2::Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open the repository rooted exactly at `path`.
    ///
    /// Unlike `git` itself this does not search parent directories, so a
    /// plain subdirectory of a working tree fails to open.
    pub fn open(path: &Path) -> Result<Self> {
        let inner = git2::Repository::open_ext(
            path,
            RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )?;
        Ok(Self {
            inner,
            path: path.to_path_buf(),
        })
    }
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo").field("path", &self.path).finish()
    }
}

fn to_oid(id: &ObjectId) -> Result<Oid> {
    Ok(Oid::from_bytes(id.as_bytes())?)
}

fn from_oid(oid: Oid) -> ObjectId {
    ObjectId::from_bytes(oid.as_bytes())
}

impl RepoAccess for GitRepo {
    fn is_bare(&self) -> bool {
        self.inner.is_bare()
    }

    fn branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.inner.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.get().name() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn head(&self) -> Result<ObjectId> {
        let head = self.inner.head()?;
        let oid = head
            .resolve()?
            .target()
            .ok_or_else(|| git2::Error::from_str("HEAD does not point at an object"))?;
        Ok(from_oid(oid))
    }

    fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId> {
        let commit = self.inner.find_commit(to_oid(commit)?)?;
        Ok(from_oid(commit.tree_id()))
    }

    fn tree_entries(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>> {
        let tree = self.inner.find_tree(to_oid(tree)?)?;
        let entries = tree
            .iter()
            .map(|entry| {
                TreeEntry::new(
                    String::from_utf8_lossy(entry.name_bytes()),
                    EntryMode::from_raw(entry.filemode_raw() as u32),
                    from_oid(entry.id()),
                )
            })
            .collect();
        Ok(entries)
    }

    fn blob_size(&self, blob: &ObjectId) -> Result<u64> {
        let odb = self.inner.odb()?;
        let (size, kind) = odb.read_header(to_oid(blob)?).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::NotFound(blob.clone())
            } else {
                Error::Git(e)
            }
        })?;
        if kind != ObjectType::Blob {
            return Err(Error::WrongKind {
                id: blob.clone(),
                expected: "blob",
            });
        }
        Ok(size as u64)
    }

    fn open_blob(&self, blob: &ObjectId) -> Result<Box<dyn Read + '_>> {
        let blob = self.inner.find_blob(to_oid(blob)?)?;
        Ok(Box::new(BlobReader { blob, pos: 0 }))
    }
}

/// Reads the content of a blob held by libgit2 without copying it.
struct BlobReader<'repo> {
    blob: git2::Blob<'repo>,
    pos: usize,
}

impl Read for BlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.blob.content()[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}
