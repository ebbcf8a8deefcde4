//! Error types for annexcheck operations

use std::path::PathBuf;

use crate::access::ObjectId;

/// Result type for annexcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while auditing a repository store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("Object {id} is not a {expected}")]
    WrongKind { id: ObjectId, expected: &'static str },

    #[error("Repository store {path:?} is not accessible: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
