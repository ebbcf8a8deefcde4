//! Worker pool that scans repositories concurrently
//!
//! ```text
//!   submit() ──► [ bounded job queue ] ──► worker 1..N ──► Scanner::scan
//!                                              │
//!   wait()   ◄── [ results channel   ] ◄───────┘  (+ completed counter)
//! ```
//!
//! Each repository is moved into exactly one worker, which is then its only
//! writer. Finished repositories come back over the results channel, so
//! `wait` blocks on a channel instead of polling the counter.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::repository::Repository;
use crate::scanner::Scanner;

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 4;

struct Job {
    seq: u64,
    repo: Repository,
}

/// Fixed-size pool of scanning workers
pub struct Dispatcher {
    workers: usize,
    total: u64,
    scanner: Arc<Scanner>,
    job_tx: Option<Sender<Job>>,
    job_rx: Receiver<Job>,
    done_tx: Option<Sender<Job>>,
    done_rx: Receiver<Job>,
    completed: Arc<AtomicU64>,
    submitted: u64,
    handles: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Create a pool of `workers` threads for a run of `total` jobs.
    ///
    /// The job queue holds exactly `total` entries.
    pub fn new(workers: usize, total: u64, scanner: Scanner) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        let capacity = usize::try_from(total).unwrap_or(usize::MAX).max(1);
        let (job_tx, job_rx) = bounded(capacity);
        let (done_tx, done_rx) = unbounded();

        Ok(Self {
            workers,
            total,
            scanner: Arc::new(scanner),
            job_tx: Some(job_tx),
            job_rx,
            done_tx: Some(done_tx),
            done_rx,
            completed: Arc::new(AtomicU64::new(0)),
            submitted: 0,
            handles: Vec::with_capacity(workers),
        })
    }

    /// Launch all workers. Calling this twice has no effect.
    pub fn start(&mut self) -> Result<()> {
        if !self.handles.is_empty() {
            return Ok(());
        }
        let Some(done_tx) = self.done_tx.as_ref() else {
            return Ok(());
        };

        for idx in 0..self.workers {
            let jobs = self.job_rx.clone();
            let done = done_tx.clone();
            let completed = Arc::clone(&self.completed);
            let scanner = Arc::clone(&self.scanner);

            let handle = thread::Builder::new()
                .name(format!("annexcheck-worker-{}", idx))
                .spawn(move || run_worker(idx, jobs, done, completed, scanner))?;
            self.handles.push(handle);
            debug!("Worker {} started", idx);
        }
        Ok(())
    }

    /// Queue a repository for scanning. Blocks while the queue is full.
    pub fn submit(&mut self, repo: Repository) -> Result<()> {
        let Some(job_tx) = self.job_tx.as_ref() else {
            return Err(Error::InvalidConfig(
                "dispatcher is no longer accepting jobs".to_string(),
            ));
        };

        let job = Job {
            seq: self.submitted,
            repo,
        };
        job_tx
            .send(job)
            .map_err(|_| Error::InvalidConfig("job queue closed".to_string()))?;
        self.submitted += 1;
        Ok(())
    }

    /// Number of jobs finished so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Wait for every submitted job, then stop the workers.
    ///
    /// `progress` is called with `(completed, total)` after each job. The
    /// scanned repositories are returned in submission order.
    pub fn wait<F>(mut self, mut progress: F) -> Result<Vec<Repository>>
    where
        F: FnMut(u64, u64),
    {
        if self.handles.is_empty() && self.submitted > 0 {
            warn!("wait() called before start(); starting workers now");
            self.start()?;
        }
        if self.submitted != self.total {
            warn!(
                "{} jobs submitted but {} expected",
                self.submitted, self.total
            );
        }

        // Closing the queue lets workers exit once it drains; dropping our
        // results sender lets the loop below end when the last worker exits.
        self.job_tx.take();
        self.done_tx.take();

        let mut finished = Vec::with_capacity(self.submitted as usize);
        for job in self.done_rx.iter() {
            finished.push(job);
            progress(self.completed.load(Ordering::Acquire), self.total);
        }

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("A worker thread terminated abnormally");
            }
        }

        info!(
            "{} jobs complete. Stopped {} workers.",
            self.completed(),
            self.workers
        );

        finished.sort_by_key(|job| job.seq);
        Ok(finished.into_iter().map(|job| job.repo).collect())
    }
}

fn run_worker(
    idx: usize,
    jobs: Receiver<Job>,
    done: Sender<Job>,
    completed: Arc<AtomicU64>,
    scanner: Arc<Scanner>,
) {
    for mut job in jobs.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| scanner.scan(&mut job.repo)));
        if outcome.is_err() {
            error!(
                repo = %job.repo.path().display(),
                worker = idx,
                "Scan aborted by a panic; repository has no results"
            );
            job.repo.set_missing_content(Vec::new());
        }

        completed.fetch_add(1, Ordering::AcqRel);
        if done.send(job).is_err() {
            break;
        }
    }
    debug!("Worker {} stopped", idx);
}
