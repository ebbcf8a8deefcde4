//! Fork detection from a hosting-platform database export
//!
//! The export is two line-delimited JSON files in one directory:
//!
//! - `User.json`: `{"ID": 1, "Name": "alice", "FullName": "...", "Email": "..."}`
//! - `Repository.json`: `{"ID": 7, "OwnerID": 1, "Name": "data", "IsFork": false}`
//!
//! Repositories are indexed by the lower-cased `owner/name`. A repository
//! whose owner is not in the user file is kept under the sentinel owner
//! [`ORPHAN_OWNER`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Owner name given to repositories whose owner record is missing.
pub const ORPHAN_OWNER: &str = "<ORPHAN>";

pub const USER_FILE: &str = "User.json";
pub const REPOSITORY_FILE: &str = "Repository.json";

/// Decides whether a discovered repository is excluded as a fork.
pub trait ForkFilter: Send + Sync {
    fn is_fork(&self, repo_path: &Path) -> bool;
}

/// Filter used when no database is configured: nothing is a fork.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoForkFilter;

impl ForkFilter for NoForkFilter {
    fn is_fork(&self, _repo_path: &Path) -> bool {
        false
    }
}

/// What to do with a repository whose database record has no owner
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Treat it like an unknown repository: not a fork, scanned.
    #[default]
    Lenient,
    /// Exclude it from scanning, like a fork.
    Exclude,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepositoryRecord {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "OwnerID")]
    pub owner_id: i64,
    pub name: String,
    #[serde(default)]
    pub is_fork: bool,
    #[serde(skip)]
    pub owner_name: String,
}

impl RepositoryRecord {
    pub fn is_orphan(&self) -> bool {
        self.owner_name == ORPHAN_OWNER
    }
}

/// In-memory view of the user and repository export
#[derive(Debug, Default)]
pub struct ForkDatabase {
    users: HashMap<i64, UserRecord>,
    repositories: HashMap<String, RepositoryRecord>,
    store_root: PathBuf,
    orphan_policy: OrphanPolicy,
}

/// Lookup key for a repository: `lower(owner/name)`.
pub fn repository_key(owner: &str, name: &str) -> String {
    format!("{}/{}", owner, name).to_lowercase()
}

impl ForkDatabase {
    pub fn new(store_root: impl Into<PathBuf>, orphan_policy: OrphanPolicy) -> Self {
        Self {
            store_root: store_root.into(),
            orphan_policy,
            ..Self::default()
        }
    }

    /// Load `User.json` and `Repository.json` from `dir`.
    ///
    /// An unreadable file is an error; malformed lines are logged and skipped.
    pub fn load(dir: &Path, store_root: &Path, orphan_policy: OrphanPolicy) -> Result<Self> {
        let mut db = Self::new(store_root, orphan_policy);

        let users = dir.join(USER_FILE);
        let file = File::open(&users)
            .with_context(|| format!("Failed to open user database {:?}", users))?;
        db.load_users(BufReader::new(file))
            .with_context(|| format!("Failed to read user database {:?}", users))?;
        info!("Loaded {} user records", db.users.len());

        let repos = dir.join(REPOSITORY_FILE);
        let file = File::open(&repos)
            .with_context(|| format!("Failed to open repository database {:?}", repos))?;
        db.load_repositories(BufReader::new(file))
            .with_context(|| format!("Failed to read repository database {:?}", repos))?;
        info!("Loaded {} repository records", db.repositories.len());

        Ok(db)
    }

    /// Ingest user records, one JSON object per line.
    pub fn load_users<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for (linenum, line) in reader.lines().enumerate() {
            let line = line?;
            match serde_json::from_str::<UserRecord>(&line) {
                Ok(user) => {
                    self.users.insert(user.id, user);
                }
                Err(e) => warn!("Failed to read user record at line {}: {}", linenum, e),
            }
        }
        Ok(())
    }

    /// Ingest repository records; users must be loaded first.
    pub fn load_repositories<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for (linenum, line) in reader.lines().enumerate() {
            let line = line?;
            let mut repo = match serde_json::from_str::<RepositoryRecord>(&line) {
                Ok(repo) => repo,
                Err(e) => {
                    warn!("Failed to read repository record at line {}: {}", linenum, e);
                    continue;
                }
            };

            repo.owner_name = match self.users.get(&repo.owner_id) {
                Some(owner) => owner.name.clone(),
                None => {
                    warn!("Repository {:?} appears to be an orphan", repo.name);
                    ORPHAN_OWNER.to_string()
                }
            };
            let key = repository_key(&repo.owner_name, &repo.name);
            self.repositories.insert(key, repo);
        }
        Ok(())
    }

    pub fn user(&self, id: i64) -> Option<&UserRecord> {
        self.users.get(&id)
    }

    pub fn repository(&self, owner: &str, name: &str) -> Option<&RepositoryRecord> {
        self.repositories.get(&repository_key(owner, name))
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Owner and name of the repository at `repo_path`.
    ///
    /// The store is laid out as `<store>/<owner>/<name>[.git]`, so the parent
    /// directory names the owner.
    pub fn owner_and_name(&self, repo_path: &Path) -> Option<(String, String)> {
        let relative = repo_path.strip_prefix(&self.store_root).unwrap_or(repo_path);
        let name = relative.file_name()?.to_string_lossy();
        let owner = relative.parent()?.file_name()?.to_string_lossy();
        let name = name.strip_suffix(".git").unwrap_or(&name);
        Some((owner.into_owned(), name.to_string()))
    }
}

impl ForkFilter for ForkDatabase {
    fn is_fork(&self, repo_path: &Path) -> bool {
        let Some((owner, name)) = self.owner_and_name(repo_path) else {
            warn!(repo = %repo_path.display(), "Cannot derive owner/name; assuming not a fork");
            return false;
        };

        if let Some(record) = self.repository(&owner, &name) {
            return record.is_fork;
        }

        if self.repository(ORPHAN_OWNER, &name).is_some() {
            warn!(
                repo = %repo_path.display(),
                "Repository {}/{} only matches an orphaned record", owner, name
            );
            return self.orphan_policy == OrphanPolicy::Exclude;
        }

        warn!(
            repo = %repo_path.display(),
            "Repository {}/{} not found in database; assuming not a fork", owner, name
        );
        false
    }
}
