//! annexcheck: find annexed files with missing content
//!
//! Scans a repository store recursively for git-annex repositories and
//! reports every file at HEAD whose content is absent from the local annex.
//!
//! # Usage
//!
//! ```bash
//! # Scan a store with the default 4 workers
//! annexcheck /srv/repos
//!
//! # Skip forks listed in a database export, 8 workers, JSON output
//! annexcheck --database /srv/db-export --nworkers 8 --json /srv/repos
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use annexcheck_core::{AuditConfig, OrphanPolicy, fork_filter, run_audit};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when `--strict` is set and content is missing.
const EXIT_MISSING: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "annexcheck")]
#[command(author = "Annexcheck Contributors")]
#[command(version)]
#[command(about = "Scan a path recursively for annexed files with missing data")]
struct Cli {
    /// Repository store to scan (recursively)
    store: Option<PathBuf>,

    /// Directory with User.json and Repository.json used to detect forks;
    /// if unspecified, no fork detection is performed
    #[arg(long)]
    database: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'n', long)]
    nworkers: Option<usize>,

    /// How to treat database repositories without an owner
    #[arg(long, value_enum)]
    orphans: Option<Orphans>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Do not print progress
    #[arg(short, long)]
    quiet: bool,

    /// Exit with status 2 if any content is missing
    #[arg(long)]
    strict: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Orphans {
    /// Scan them like any repository not in the database
    Lenient,
    /// Exclude them like forks
    Exclude,
}

impl From<Orphans> for OrphanPolicy {
    fn from(value: Orphans) -> Self {
        match value {
            Orphans::Lenient => OrphanPolicy::Lenient,
            Orphans::Exclude => OrphanPolicy::Exclude,
        }
    }
}

impl Cli {
    /// Merge the configuration file (if any) with command-line flags.
    fn audit_config(&self) -> Result<AuditConfig> {
        let mut config = match &self.config {
            Some(path) => AuditConfig::load(path)?,
            None => AuditConfig::default(),
        };

        if let Some(store) = &self.store {
            config.store = store.clone();
        }
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(workers) = self.nworkers {
            config.workers = workers;
        }
        if let Some(orphans) = self.orphans {
            config.orphan_policy = orphans.into();
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(debug: bool) {
    let env_filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn run(cli: &Cli) -> Result<bool> {
    let config = cli.audit_config()?;
    let filter = fork_filter(&config)?;

    let quiet = cli.quiet;
    let report = run_audit(&config, filter.as_ref(), |completed, total| {
        if !quiet {
            eprint!("\r : {}/{}", completed, total);
        }
    })?;
    if !quiet && report.submitted > 0 {
        eprintln!();
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if cli.json {
        report.write_json(&mut handle)?;
    } else {
        report.write_text(&mut handle)?;
    }
    handle.flush()?;

    Ok(report.is_clean())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(clean) if !clean && cli.strict => ExitCode::from(EXIT_MISSING),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
