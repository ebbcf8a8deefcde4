//! Audit configuration
//!
//! Every field has a default, so a configuration file only needs the values
//! it changes. Command-line flags are applied on top of the loaded file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dispatcher::DEFAULT_WORKERS;
use crate::error::Error;
use crate::forks::OrphanPolicy;

/// Settings for one audit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Repository store to scan (recursively).
    pub store: PathBuf,
    /// Directory holding `User.json` and `Repository.json`; no fork
    /// detection when unset.
    pub database: Option<PathBuf>,
    /// Number of concurrent scanning workers.
    pub workers: usize,
    /// Handling of repository records without an owner.
    pub orphan_policy: OrphanPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::new(),
            database: None,
            workers: DEFAULT_WORKERS,
            orphan_policy: OrphanPolicy::default(),
        }
    }
}

impl AuditConfig {
    pub fn new(store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: AuditConfig = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config JSON {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.store.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "no repository store given".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
