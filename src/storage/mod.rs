//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Page, link, redirect and script persistence
//! - Error and job report tracking
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub rules_hash: String,
    pub driver: String,
    pub status: RunStatus,
}

/// A URL whose fetch failed
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub url: String,
    pub message: String,
    pub occurred_at: String,
}

/// Stored terminal report of one job
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: usize,
    pub seed: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub waves: u32,
    pub fetched: u64,
    pub failed: u64,
    pub skipped: u64,
    pub discovered: u64,
    pub processed: u64,
    pub elapsed_secs: f64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
