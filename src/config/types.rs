use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Wavecrawl
///
/// Every section is optional; a missing config file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: Option<UserAgentConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of seed jobs running at once
    #[serde(rename = "max-concurrent-jobs")]
    pub max_concurrent_jobs: u32,

    /// Maximum number of in-flight fetches within one job
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Timeout applied by the HTTP fetcher to every request (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum redirect hops followed for one navigation
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Extra attempts for transient fetch failures (0 disables retries)
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Pause between retry attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Lower bound of the random pause after every fetch (milliseconds)
    #[serde(rename = "settle-delay-min-ms")]
    pub settle_delay_min_ms: u64,

    /// Upper bound of the random pause after every fetch (milliseconds)
    #[serde(rename = "settle-delay-max-ms")]
    pub settle_delay_max_ms: u64,

    /// Admit seeds and dispatch each wave in a random order
    #[serde(rename = "shuffle-waves")]
    pub shuffle_waves: bool,

    /// Download script resources referenced by crawled pages
    #[serde(rename = "capture-scripts")]
    pub capture_scripts: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            max_concurrent_fetches: 3,
            fetch_timeout_secs: 30,
            max_redirects: 10,
            max_retries: 0,
            retry_delay_ms: 5000,
            settle_delay_min_ms: 3000,
            settle_delay_max_ms: 6000,
            shuffle_waves: true,
            capture_scripts: true,
        }
    }
}

/// Optional override of the driver's User-Agent string
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Full User-Agent header value
    pub name: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory; each driver writes into `<root-dir>/<driver>/`
    #[serde(rename = "root-dir")]
    pub root_dir: PathBuf,

    /// SQLite database that additionally receives every record
    #[serde(rename = "database-path")]
    pub database_path: Option<PathBuf>,

    /// Write a markdown run report per driver when the run finishes
    pub report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./output"),
            database_path: None,
            report: true,
        }
    }
}

/// Seed rule file: a list of `[[rule]]` tables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rule: Vec<SeedRule>,
}

/// One seed URL with its crawl rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedRule {
    /// Root URL of the crawl
    pub url: String,

    /// Link filter pattern (regex over absolute URLs)
    ///
    /// Defaults to the escaped hostname of `url`.
    #[serde(default)]
    pub filter: Option<String>,

    /// Depth budget; 0 fetches only the seed
    #[serde(default)]
    pub depth: u32,

    /// Backlink recorded for the seed itself
    #[serde(default)]
    pub backlink: Option<String>,
}

impl SeedRule {
    /// Creates a rule with the default filter and depth 0
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filter: None,
            depth: 0,
            backlink: None,
        }
    }

    /// Sets the link filter pattern
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the depth budget
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Returns the filter pattern, deriving it from the hostname when absent
    pub fn effective_filter(&self) -> Result<String, url::ParseError> {
        match &self.filter {
            Some(filter) if !filter.is_empty() => Ok(filter.clone()),
            _ => {
                let parsed = url::Url::parse(&self.url)?;
                let host = parsed.host_str().ok_or(url::ParseError::EmptyHost)?;
                Ok(regex::escape(host))
            }
        }
    }
}
