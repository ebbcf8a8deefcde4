//! Repository access capability
//!
//! The scanner never talks to a git implementation directly. Each
//! [`Repository`](crate::Repository) owns a boxed [`RepoAccess`] that exposes
//! the handful of primitive reads the audit needs: branch listing, HEAD
//! resolution, tree listing and blob reads. [`GitRepo`](crate::git::GitRepo)
//! is the on-disk implementation; tests plug in in-memory ones.

use std::fmt;
use std::io::Read;

use crate::error::Result;

/// Identifier of a git object (commit, tree or blob)
///
/// Stored as raw bytes so both SHA-1 and SHA-256 object formats fit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Vec<u8>);

impl ObjectId {
    /// Create an ObjectId from raw digest bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Parse from hexadecimal string
    pub fn from_hex(hex_str: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str)?;
        if bytes.is_empty() {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self(bytes))
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Kind of a tree entry, decoded from its raw git file mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// `100644`
    Regular,
    /// `100755`
    Executable,
    /// `120000`
    Symlink,
    /// `040000`
    Tree,
    /// `160000` (gitlink)
    Submodule,
    /// Anything else, including the deprecated group-writable `100664`
    Other(u32),
}

impl EntryMode {
    pub fn from_raw(mode: u32) -> Self {
        match mode {
            0o100644 => EntryMode::Regular,
            0o100755 => EntryMode::Executable,
            0o120000 => EntryMode::Symlink,
            0o040000 => EntryMode::Tree,
            0o160000 => EntryMode::Submodule,
            other => EntryMode::Other(other),
        }
    }

    /// Whether entries of this kind are stored as blobs the scanner inspects.
    pub fn is_file_like(self) -> bool {
        matches!(
            self,
            EntryMode::Regular | EntryMode::Executable | EntryMode::Symlink
        )
    }
}

/// A single (non-recursive) entry of a git tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: EntryMode,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, mode: EntryMode, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            mode,
            id,
        }
    }
}

/// Read access to one repository's object database and refs.
///
/// Implementations must be `Send`: a repository is handed to exactly one
/// dispatcher worker, which is the only code touching it while it is scanned.
pub trait RepoAccess: Send {
    /// True for repositories without a working tree.
    fn is_bare(&self) -> bool;

    /// Full names (`refs/heads/...`) of all local branches.
    fn branches(&self) -> Result<Vec<String>>;

    /// Commit id at the tip of the current branch.
    fn head(&self) -> Result<ObjectId>;

    /// Root tree of the given commit.
    fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId>;

    /// Direct children of a tree, in tree order.
    fn tree_entries(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>>;

    /// Size of a blob in bytes, without reading its content.
    fn blob_size(&self, blob: &ObjectId) -> Result<u64>;

    /// Open a blob's content for reading.
    fn open_blob(&self, blob: &ObjectId) -> Result<Box<dyn Read + '_>>;
}
