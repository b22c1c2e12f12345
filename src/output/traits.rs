//! Result emitter trait and run summary types
//!
//! This module defines the interface through which crawl jobs hand their
//! results to downstream consumers, plus the summary a driver run is
//! reported with.

use crate::crawler::{Driver, JobContext, JobOutcome, JobReport, PageResult};
use crate::FetchError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Directory collision at {}: {source}", .path.display())]
    DirectoryCollision {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Consumer of crawl results
///
/// Emitters are called concurrently from every dispatcher of every job, so
/// implementations must be thread-safe. An emitter error is logged by the
/// caller and never aborts the job that produced the record.
pub trait ResultEmitter: Send + Sync {
    /// Records a successfully fetched page
    ///
    /// # Arguments
    ///
    /// * `job` - The job the page belongs to
    /// * `page` - The extracted page data
    fn page(&self, job: &JobContext, page: &PageResult) -> OutputResult<()>;

    /// Records a URL whose fetch failed
    ///
    /// # Arguments
    ///
    /// * `job` - The job the URL belongs to
    /// * `url` - The URL that failed
    /// * `error` - Why it failed
    fn fetch_failed(&self, job: &JobContext, url: &str, error: &FetchError) -> OutputResult<()>;

    /// Records the terminal report of a job
    fn job_finished(&self, report: &JobReport) -> OutputResult<()>;
}

/// Summary of all jobs of one driver run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub driver: Driver,
    pub rules_hash: String,
    pub started_at: String,
    pub elapsed: Duration,
    pub jobs: Vec<JobReport>,
}

impl RunSummary {
    pub fn new(driver: Driver, rules_hash: impl Into<String>, jobs: Vec<JobReport>) -> Self {
        Self {
            driver,
            rules_hash: rules_hash.into(),
            started_at: chrono::Utc::now().to_rfc3339(),
            elapsed: Duration::ZERO,
            jobs,
        }
    }

    pub fn total_fetched(&self) -> usize {
        self.jobs.iter().map(|j| j.fetched).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.jobs.iter().map(|j| j.failed).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.jobs.iter().map(|j| j.skipped).sum()
    }

    pub fn total_discovered(&self) -> usize {
        self.jobs.iter().map(|j| j.discovered).sum()
    }

    pub fn jobs_with_outcome(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.jobs.iter().filter(|j| pred(&j.outcome)).count()
    }

    /// Returns the fetch success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempts = self.total_fetched() + self.total_failed();
        if attempts == 0 {
            return 0.0;
        }
        (self.total_fetched() as f64 / attempts as f64) * 100.0
    }
}
