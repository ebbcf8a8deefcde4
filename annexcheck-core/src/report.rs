//! Audit report and its human-readable rendering

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::repository::{MissingContent, Repository};

/// Missing content found in one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReport {
    pub path: PathBuf,
    pub missing: Vec<MissingContent>,
}

/// Outcome of scanning a repository store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub store: PathBuf,
    /// Repositories found under the store.
    pub discovered: usize,
    /// Repositories with a git-annex branch.
    pub annex_enabled: usize,
    /// Annex-enabled repositories excluded as forks.
    pub forks_excluded: usize,
    /// Repositories handed to the scanner.
    pub submitted: u64,
    /// Only repositories with at least one missing file, in discovery order.
    pub repositories: Vec<RepositoryReport>,
}

impl AuditReport {
    pub fn new(store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
            ..Self::default()
        }
    }

    /// Record the result of a scanned repository.
    pub fn add_scanned(&mut self, repo: &Repository) {
        if repo.missing_content().is_empty() {
            return;
        }
        self.repositories.push(RepositoryReport {
            path: repo.path().to_path_buf(),
            missing: repo.missing_content().to_vec(),
        });
    }

    /// Total number of missing files across all repositories.
    pub fn missing_count(&self) -> usize {
        self.repositories.iter().map(|r| r.missing.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Write the plain-text report.
    pub fn write_text(&self, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "Total repositories scanned:         {:5}", self.discovered)?;
        writeln!(writer, "Repositories with git-annex branch: {:5}", self.annex_enabled)?;
        writeln!(writer, "Forks excluded:                     {:5}", self.forks_excluded)?;
        writeln!(writer, "Repositories checked:               {:5}", self.submitted)?;
        writeln!(writer)?;

        if self.is_clean() {
            writeln!(writer, "No missing content found.")?;
            return Ok(());
        }

        for repo in &self.repositories {
            writeln!(
                writer,
                "Repository {:?} is missing content for the following files:",
                repo.path
            )?;
            for (idx, missing) in repo.missing.iter().enumerate() {
                writeln!(
                    writer,
                    "  {}: {} [{}]",
                    idx + 1,
                    missing.tree_path,
                    missing.object_path.display()
                )?;
            }
            writeln!(writer)?;
        }

        writeln!(
            writer,
            "Summary: {} missing file(s) in {} repository(ies)",
            self.missing_count(),
            self.repositories.len()
        )?;
        Ok(())
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }
}
