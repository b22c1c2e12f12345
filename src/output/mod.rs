//! Output module: result emitters and run reports
//!
//! This module handles:
//! - Writing page results into a per-driver file tree
//! - Recording results in the SQLite database
//! - Fanning results out to several emitters
//! - Run statistics and markdown run reports

mod files;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use files::FileEmitter;
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use sqlite_output::{SharedStorage, SqliteEmitter};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputResult, ResultEmitter, RunSummary};

use crate::crawler::{JobContext, JobReport, PageResult};
use crate::FetchError;
use std::sync::Arc;

/// Forwards every record to several emitters
///
/// All emitters receive every record even if an earlier one fails; the first
/// error is returned.
#[derive(Default, Clone)]
pub struct FanoutEmitter {
    emitters: Vec<Arc<dyn ResultEmitter>>,
}

impl FanoutEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, emitter: Arc<dyn ResultEmitter>) -> Self {
        self.emitters.push(emitter);
        self
    }

    fn each(&self, f: impl Fn(&dyn ResultEmitter) -> OutputResult<()>) -> OutputResult<()> {
        let mut first_error = None;
        for emitter in &self.emitters {
            if let Err(e) = f(emitter.as_ref()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl ResultEmitter for FanoutEmitter {
    fn page(&self, job: &JobContext, page: &PageResult) -> OutputResult<()> {
        self.each(|e| e.page(job, page))
    }

    fn fetch_failed(&self, job: &JobContext, url: &str, error: &FetchError) -> OutputResult<()> {
        self.each(|e| e.fetch_failed(job, url, error))
    }

    fn job_finished(&self, report: &JobReport) -> OutputResult<()> {
        self.each(|e| e.job_finished(report))
    }
}
