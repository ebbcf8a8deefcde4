//! Repositories under audit
//!
//! A [`Repository`] is created once at discovery and then moved, whole, to
//! the single dispatcher worker that scans it. Its missing-content list is
//! written by that worker only.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::error;

use crate::access::RepoAccess;
use crate::git::GitRepo;

/// Full name of the branch git-annex keeps its metadata on.
pub const ANNEX_BRANCH: &str = "refs/heads/git-annex";

/// An annexed file whose content is not present in the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingContent {
    /// Path of the file in the repository tree
    pub tree_path: String,
    /// Expected location of the content (lower-case hash layout)
    pub object_path: PathBuf,
}

/// A discovered repository together with its access capability
pub struct Repository {
    path: PathBuf,
    has_annex_branch: bool,
    is_fork: bool,
    missing_content: Vec<MissingContent>,
    access: Box<dyn RepoAccess>,
}

impl Repository {
    /// Wrap an access capability, recording whether it carries an annex branch.
    ///
    /// Branch enumeration failures are logged and treated as "no annex".
    pub fn new(path: impl Into<PathBuf>, access: Box<dyn RepoAccess>) -> Self {
        let path = path.into();
        let has_annex_branch = match access.branches() {
            Ok(branches) => branches.iter().any(|b| b == ANNEX_BRANCH),
            Err(e) => {
                error!(repo = %path.display(), "Failed to list branches: {}", e);
                false
            }
        };

        Self {
            path,
            has_annex_branch,
            is_fork: false,
            missing_content: Vec::new(),
            access,
        }
    }

    /// Open the on-disk repository at `path`, or `None` if it is not one.
    pub fn open(path: &Path) -> Option<Self> {
        let access = GitRepo::open(path).ok()?;
        Some(Self::new(path, Box::new(access)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_annex_branch(&self) -> bool {
        self.has_annex_branch
    }

    pub fn is_fork(&self) -> bool {
        self.is_fork
    }

    pub fn set_fork(&mut self, is_fork: bool) {
        self.is_fork = is_fork;
    }

    /// Whether this repository should be handed to the scanner.
    pub fn should_scan(&self) -> bool {
        self.has_annex_branch && !self.is_fork
    }

    pub fn access(&self) -> &dyn RepoAccess {
        self.access.as_ref()
    }

    pub fn missing_content(&self) -> &[MissingContent] {
        &self.missing_content
    }

    pub fn set_missing_content(&mut self, missing: Vec<MissingContent>) {
        self.missing_content = missing;
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("has_annex_branch", &self.has_annex_branch)
            .field("is_fork", &self.is_fork)
            .field("missing_content", &self.missing_content)
            .finish_non_exhaustive()
    }
}
