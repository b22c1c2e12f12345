//! Seed jobs and their terminal reports

use crate::config::SeedRule;
use crate::crawler::driver::Driver;
use crate::url::LinkFilter;
use crate::CrawlError;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Immutable description of one seed's crawl
///
/// Built once per rule by the job scheduler and shared read-only by the
/// job's orchestrator, dispatchers and the result emitter.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Position of the rule in the input list
    pub id: usize,
    pub rule: SeedRule,
    pub driver: Driver,
    pub filter: LinkFilter,
}

impl JobContext {
    /// Creates a job context, compiling the rule's link filter
    ///
    /// # Errors
    ///
    /// Fails if the seed URL has no derivable filter or the filter pattern
    /// does not compile. Either failure is fatal to this job only.
    pub fn new(id: usize, rule: SeedRule, driver: Driver) -> Result<Self, CrawlError> {
        let pattern = rule.effective_filter()?;
        let filter = LinkFilter::new(&pattern)?;
        Ok(Self {
            id,
            rule,
            driver,
            filter,
        })
    }

    pub fn seed(&self) -> &str {
        &self.rule.url
    }

    pub fn max_depth(&self) -> u32 {
        self.rule.depth
    }

    /// Backlink the seed itself was given in the rule file
    pub fn seed_backlink(&self) -> Option<&str> {
        self.rule.backlink.as_deref().filter(|b| !b.is_empty())
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum JobOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Terminal summary of one seed job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub id: usize,
    pub seed: String,
    pub driver: Driver,
    /// Waves that were dispatched (wave 0 is the seed)
    pub waves: u32,
    /// Successful fetches
    pub fetched: usize,
    /// URLs rejected by the link filter
    pub skipped: usize,
    /// Fetch attempts that ended in an error
    pub failed: usize,
    pub discovered: usize,
    pub processed: usize,
    pub outcome: JobOutcome,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl JobReport {
    /// Report for a job that ended before its first wave
    pub fn failed(id: usize, seed: &str, driver: Driver, reason: impl Into<String>) -> Self {
        Self {
            id,
            seed: seed.to_string(),
            driver,
            waves: 0,
            fetched: 0,
            skipped: 0,
            failed: 0,
            discovered: 0,
            processed: 0,
            outcome: JobOutcome::Failed(reason.into()),
            elapsed: Duration::ZERO,
        }
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
