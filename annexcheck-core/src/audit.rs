//! End-to-end audit of a repository store
//!
//! Discovery, fork filtering, concurrent scanning and report assembly.

use tracing::{debug, info};

use crate::config::AuditConfig;
use crate::dispatcher::Dispatcher;
use crate::discovery::discover;
use crate::error::Result;
use crate::forks::{ForkDatabase, ForkFilter, NoForkFilter};
use crate::report::AuditReport;
use crate::repository::Repository;
use crate::scanner::Scanner;

/// Build the fork filter described by `config`.
///
/// Without a configured database nothing is treated as a fork.
pub fn fork_filter(config: &AuditConfig) -> anyhow::Result<Box<dyn ForkFilter>> {
    match &config.database {
        Some(dir) => {
            info!("Loading fork database from {}", dir.display());
            let db = ForkDatabase::load(dir, &config.store, config.orphan_policy)?;
            Ok(Box::new(db))
        }
        None => Ok(Box::new(NoForkFilter)),
    }
}

/// Scan every annex-enabled, non-fork repository under the configured store.
///
/// `progress` receives `(completed, total)` as repositories finish.
pub fn run_audit<F>(config: &AuditConfig, filter: &dyn ForkFilter, progress: F) -> Result<AuditReport>
where
    F: FnMut(u64, u64),
{
    config.validate()?;
    info!("Scanning {}", config.store.display());

    let repos = discover(&config.store, filter)?;
    let mut report = AuditReport::new(&config.store);
    report.discovered = repos.len();
    report.annex_enabled = repos.iter().filter(|r| r.has_annex_branch()).count();
    report.forks_excluded = repos
        .iter()
        .filter(|r| r.has_annex_branch() && r.is_fork())
        .count();

    let to_scan: Vec<Repository> = repos.into_iter().filter(Repository::should_scan).collect();
    let total = to_scan.len() as u64;
    info!(
        "Found {} repositories, {} with git-annex branch, {} to check",
        report.discovered, report.annex_enabled, total
    );

    let mut dispatcher = Dispatcher::new(config.workers, total, Scanner::new())?;
    dispatcher.start()?;
    for (idx, repo) in to_scan.into_iter().enumerate() {
        debug!("{}: {}", idx + 1, repo.path().display());
        dispatcher.submit(repo)?;
    }
    report.submitted = dispatcher.submitted();

    for repo in dispatcher.wait(progress)? {
        report.add_scanned(&repo);
    }

    info!(
        "{} missing file(s) in {} repository(ies)",
        report.missing_count(),
        report.repositories.len()
    );
    Ok(report)
}
