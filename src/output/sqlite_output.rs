//! SQLite-based result emitter
//!
//! This module provides an emitter that records crawl results directly to
//! the SQLite storage backend.

use crate::crawler::{JobContext, JobReport, PageResult};
use crate::output::traits::{OutputError, OutputResult, ResultEmitter};
use crate::storage::{RunStatus, Storage};
use crate::FetchError;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a storage backend
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// SQLite-based result emitter
///
/// Every record is written under one run ID; the run is created by the caller
/// and finished with `finish`.
pub struct SqliteEmitter {
    storage: SharedStorage,
    run_id: i64,
}

impl SqliteEmitter {
    /// Creates a new SQLite emitter
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `run_id` - The current run ID
    pub fn new(storage: SharedStorage, run_id: i64) -> Self {
        Self { storage, run_id }
    }

    /// Opens a run for `driver` and returns an emitter writing into it
    pub fn start_run(storage: SharedStorage, rules_hash: &str, driver: &str) -> OutputResult<Self> {
        let run_id = {
            let mut guard = lock(&storage)?;
            guard
                .create_run(rules_hash, driver)
                .map_err(|e| OutputError::Storage(e.to_string()))?
        };
        Ok(Self::new(storage, run_id))
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Marks the run finished
    pub fn finish(&self, status: RunStatus) -> OutputResult<()> {
        lock(&self.storage)?
            .finish_run(self.run_id, status)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }
}

fn lock(storage: &SharedStorage) -> OutputResult<MutexGuard<'_, dyn Storage + Send + 'static>> {
    storage
        .lock()
        .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))
}

impl ResultEmitter for SqliteEmitter {
    fn page(&self, job: &JobContext, page: &PageResult) -> OutputResult<()> {
        let is_internal = |url: &str| job.filter.matches(url);
        lock(&self.storage)?
            .record_page(self.run_id, job.id, page, &is_internal)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }

    fn fetch_failed(&self, _job: &JobContext, url: &str, error: &FetchError) -> OutputResult<()> {
        lock(&self.storage)?
            .record_error(self.run_id, url, &error.to_string())
            .map_err(|e| OutputError::Storage(e.to_string()))
    }

    fn job_finished(&self, report: &JobReport) -> OutputResult<()> {
        lock(&self.storage)?
            .record_job(self.run_id, report)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }
}
