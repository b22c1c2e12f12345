//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{JobReport, PageResult};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ErrorRecord, JobRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, params![run_id], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        rules_hash: row.get(3)?,
        driver: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, rules_hash: &str, driver: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, rules_hash, driver, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, rules_hash, driver, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, rules_hash, driver, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, rules_hash, driver, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Crawl Records =====

    fn record_page(
        &mut self,
        run_id: i64,
        job_id: usize,
        page: &PageResult,
        is_internal: &dyn Fn(&str) -> bool,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO pages
             (run_id, job_id, url, title, keywords, description, body_text, backlink, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                job_id as i64,
                page.url,
                page.title,
                page.keywords,
                page.description,
                page.body_text,
                page.backlink,
                now
            ],
        )?;

        for link in &page.links {
            tx.execute(
                "INSERT OR IGNORE INTO links (run_id, from_url, to_url, internal) VALUES (?1, ?2, ?3, ?4)",
                params![run_id, page.url, link, is_internal(link)],
            )?;
        }

        for (source, location) in &page.redirects {
            tx.execute(
                "INSERT OR IGNORE INTO redirects (run_id, source_url, location) VALUES (?1, ?2, ?3)",
                params![run_id, source, location],
            )?;
        }

        for (url, body) in &page.scripts {
            tx.execute(
                "INSERT OR IGNORE INTO scripts (run_id, url, page_url, body) VALUES (?1, ?2, ?3, ?4)",
                params![run_id, url, page.url, body],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn record_error(&mut self, run_id: i64, url: &str, message: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO errors (run_id, url, message, occurred_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, url, message, now],
        )?;
        Ok(())
    }

    fn record_job(&mut self, run_id: i64, report: &JobReport) -> StorageResult<()> {
        let reason = match &report.outcome {
            crate::crawler::JobOutcome::Failed(reason) => Some(reason.as_str()),
            _ => None,
        };
        self.conn.execute(
            "INSERT OR REPLACE INTO jobs
             (run_id, job_id, seed, outcome, reason, waves, fetched, failed, skipped, discovered, processed, elapsed_secs)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                run_id,
                report.id as i64,
                report.seed,
                report.outcome.as_str(),
                reason,
                report.waves,
                report.fetched as i64,
                report.failed as i64,
                report.skipped as i64,
                report.discovered as i64,
                report.processed as i64,
                report.elapsed.as_secs_f64()
            ],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_pages(&self, run_id: i64) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM pages WHERE run_id = ?1", run_id)
    }

    fn count_links(&self, run_id: i64, internal: Option<bool>) -> StorageResult<u64> {
        match internal {
            None => self.count("SELECT COUNT(*) FROM links WHERE run_id = ?1", run_id),
            Some(internal) => {
                let count: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM links WHERE run_id = ?1 AND internal = ?2",
                    params![run_id, internal],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            }
        }
    }

    fn count_redirects(&self, run_id: i64) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM redirects WHERE run_id = ?1", run_id)
    }

    fn count_scripts(&self, run_id: i64) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM scripts WHERE run_id = ?1", run_id)
    }

    fn get_errors(&self, run_id: i64) -> StorageResult<Vec<ErrorRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, message, occurred_at FROM errors WHERE run_id = ?1 ORDER BY id",
        )?;
        let errors = stmt
            .query_map(params![run_id], |row| {
                Ok(ErrorRecord {
                    url: row.get(0)?,
                    message: row.get(1)?,
                    occurred_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(errors)
    }

    fn get_jobs(&self, run_id: i64) -> StorageResult<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, seed, outcome, reason, waves, fetched, failed, skipped, discovered, processed, elapsed_secs
             FROM jobs WHERE run_id = ?1 ORDER BY job_id",
        )?;
        let jobs = stmt
            .query_map(params![run_id], |row| {
                Ok(JobRecord {
                    job_id: row.get::<_, i64>(0)? as usize,
                    seed: row.get(1)?,
                    outcome: row.get(2)?,
                    reason: row.get(3)?,
                    waves: row.get(4)?,
                    fetched: row.get::<_, i64>(5)? as u64,
                    failed: row.get::<_, i64>(6)? as u64,
                    skipped: row.get::<_, i64>(7)? as u64,
                    discovered: row.get::<_, i64>(8)? as u64,
                    processed: row.get::<_, i64>(9)? as u64,
                    elapsed_secs: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }
}
