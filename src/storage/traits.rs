//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::{JobReport, PageResult};
use crate::storage::{ErrorRecord, JobRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed to persist crawl
/// results and read them back for statistics.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `rules_hash` - Hash of the rule file
    /// * `driver` - Name of the driver the run uses
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, rules_hash: &str, driver: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Crawl Records =====

    /// Stores a fetched page with its links, redirects and scripts
    ///
    /// `is_internal` decides which links fall inside the job's filter.
    fn record_page(
        &mut self,
        run_id: i64,
        job_id: usize,
        page: &PageResult,
        is_internal: &dyn Fn(&str) -> bool,
    ) -> StorageResult<()>;

    /// Stores a URL whose fetch failed
    fn record_error(&mut self, run_id: i64, url: &str, message: &str) -> StorageResult<()>;

    /// Stores the terminal report of a job
    fn record_job(&mut self, run_id: i64, report: &JobReport) -> StorageResult<()>;

    // ===== Statistics =====

    fn count_pages(&self, run_id: i64) -> StorageResult<u64>;

    /// Counts links, optionally only internal (`Some(true)`) or external ones
    fn count_links(&self, run_id: i64, internal: Option<bool>) -> StorageResult<u64>;

    fn count_redirects(&self, run_id: i64) -> StorageResult<u64>;

    fn count_scripts(&self, run_id: i64) -> StorageResult<u64>;

    fn get_errors(&self, run_id: i64) -> StorageResult<Vec<ErrorRecord>>;

    fn get_jobs(&self, run_id: i64) -> StorageResult<Vec<JobRecord>>;
}
