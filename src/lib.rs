//! Wavecrawl: a depth-synchronized, concurrency-bounded web crawler
//!
//! This crate crawls a set of seed URLs, each bound to a link filter and a
//! depth budget. Every seed runs as an isolated job that expands its frontier
//! one breadth-first wave at a time, while two nested concurrency gates bound
//! the number of active jobs and the number of in-flight fetches per job.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Wavecrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Invalid link filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        source: regex::Error,
    },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Concurrency gate closed")]
    GateClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure to fetch a single URL
///
/// A fetch error is always scoped to one URL. The dispatcher records it and
/// marks the URL processed; it never aborts the wave.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Redirect loop detected at {url}")]
    RedirectLoop { url: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Fetch of {url} cancelled")]
    Cancelled { url: String },

    #[error("Fetch of {url} aborted unexpectedly")]
    Aborted { url: String },
}

impl FetchError {
    /// The URL the failure belongs to
    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. }
            | Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::RedirectLimit { url }
            | Self::RedirectLoop { url }
            | Self::InvalidUrl { url, .. }
            | Self::Cancelled { url }
            | Self::Aborted { url } => url,
        }
    }

    /// Returns true for failures worth another attempt under a retry policy
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Http { source, .. } => source.is_connect() || source.is_timeout(),
            _ => false,
        }
    }
}

/// Result type alias for Wavecrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::{Config, SeedRule};
pub use crawler::{Driver, Fetcher, FetcherFactory, JobScheduler, PageResult};
pub use output::ResultEmitter;
pub use state::{FrontierStore, JobPhase};
