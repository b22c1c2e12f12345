//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{ErrorRecord, JobRecord, RunRecord, Storage, StorageResult};

/// Crawl statistics of one run
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// The run the statistics belong to
    pub run: RunRecord,

    /// Number of pages fetched
    pub pages: u64,

    /// Links found on fetched pages
    pub total_links: u64,
    pub internal_links: u64,
    pub external_links: u64,

    /// Redirect hops captured
    pub redirects: u64,

    /// Script resources captured
    pub scripts: u64,

    /// URLs whose fetch failed
    pub errors: Vec<ErrorRecord>,

    /// Per-job reports
    pub jobs: Vec<JobRecord>,
}

impl CrawlStatistics {
    /// Returns the fetch success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempts = self.pages + self.errors.len() as u64;
        if attempts == 0 {
            return 0.0;
        }
        (self.pages as f64 / attempts as f64) * 100.0
    }
}

/// Loads statistics of the most recent run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(Some(CrawlStatistics))` - Statistics of the latest run
/// * `Ok(None)` - The database holds no runs
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<Option<CrawlStatistics>> {
    let Some(run) = storage.get_latest_run()? else {
        return Ok(None);
    };
    load_run_statistics(storage, run.id).map(Some)
}

/// Loads statistics of a specific run
pub fn load_run_statistics(storage: &dyn Storage, run_id: i64) -> StorageResult<CrawlStatistics> {
    let run = storage.get_run(run_id)?;

    Ok(CrawlStatistics {
        pages: storage.count_pages(run_id)?,
        total_links: storage.count_links(run_id, None)?,
        internal_links: storage.count_links(run_id, Some(true))?,
        external_links: storage.count_links(run_id, Some(false))?,
        redirects: storage.count_redirects(run_id)?,
        scripts: storage.count_scripts(run_id)?,
        errors: storage.get_errors(run_id)?,
        jobs: storage.get_jobs(run_id)?,
        run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run {} ({}):", stats.run.id, stats.run.driver);
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Status: {}", stats.run.status.to_db_string());
    println!("  Rules hash: {}", stats.run.rules_hash);
    println!();

    println!("Overview:");
    println!("  Pages fetched: {}", stats.pages);
    println!(
        "  Links found: {} ({} internal, {} external)",
        stats.total_links, stats.internal_links, stats.external_links
    );
    println!("  Redirects captured: {}", stats.redirects);
    println!("  Scripts captured: {}", stats.scripts);
    println!("  Failed URLs: {}", stats.errors.len());
    println!();

    if !stats.jobs.is_empty() {
        println!("Jobs:");
        for job in &stats.jobs {
            print!(
                "  #{} {} - {} ({} waves, {} fetched, {} failed, {} skipped, {:.1}s)",
                job.job_id,
                job.seed,
                job.outcome,
                job.waves,
                job.fetched,
                job.failed,
                job.skipped,
                job.elapsed_secs
            );
            match &job.reason {
                Some(reason) => println!(": {}", reason),
                None => println!(),
            }
        }
        println!();
    }

    if !stats.errors.is_empty() {
        println!("Errors ({}):", stats.errors.len());
        for error in stats.errors.iter().take(20) {
            println!("  - {}: {}", error.url, error.message);
        }
        if stats.errors.len() > 20 {
            println!("  ... and {} more", stats.errors.len() - 20);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} fetches succeeded)",
        stats.success_rate(),
        stats.pages,
        stats.pages + stats.errors.len() as u64
    );
}
