//! Annexcheck Core Library
//!
//! Finds git-annex repositories whose committed tree references content that
//! is missing from the local annex object store:
//! - Annex object locations (both hash directory layouts)
//! - Pointer blob classification
//! - Tree scanning through an abstract repository access capability
//! - Concurrent scanning of a whole repository store
//! - Fork exclusion from a hosting-platform database export

pub mod access;
pub mod audit;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod forks;
pub mod git;
pub mod locator;
pub mod pointer;
pub mod report;
pub mod repository;
pub mod scanner;

#[cfg(test)]
mod test_support;

pub use access::{EntryMode, ObjectId, RepoAccess, TreeEntry};
pub use audit::{fork_filter, run_audit};
pub use config::AuditConfig;
pub use discovery::discover;
pub use dispatcher::{DEFAULT_WORKERS, Dispatcher};
pub use error::{Error, Result};
pub use forks::{ForkDatabase, ForkFilter, NoForkFilter, OrphanPolicy};
pub use git::GitRepo;
pub use locator::{hash_dir_lower, hash_dir_mixed};
pub use pointer::{ContentKey, MAX_POINTER_SIZE, classify_blob, parse_pointer};
pub use report::{AuditReport, RepositoryReport};
pub use repository::{ANNEX_BRANCH, MissingContent, Repository};
pub use scanner::Scanner;
