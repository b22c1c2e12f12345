//! Crawl dispatcher: processes one URL of a wave
//!
//! For one URL the dispatcher:
//! 1. Checks the job's cancellation token
//! 2. Applies the job's link filter (mismatches are skipped, not fetched)
//! 3. Acquires a fetch permit from the job's gate
//! 4. Invokes the fetcher, optionally retrying transient failures
//! 5. Updates the frontier and hands the outcome to the result emitter
//!
//! The fetch permit is an RAII guard held for the duration of `dispatch`, so
//! it is released on every exit path, including panics. Completion is
//! signalled to the wave barrier by the dispatch future itself finishing.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::gate::ConcurrencyGate;
use crate::crawler::job::JobContext;
use crate::output::ResultEmitter;
use crate::state::FrontierStore;
use crate::url::is_ignored_link;
use crate::FetchError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How failed fetches are retried within one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// No retries: a failed URL is recorded and never fetched again
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Result of dispatching one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Fetched successfully; `new_links` were added to the frontier
    Fetched { new_links: usize },
    /// Rejected by the link filter
    Skipped,
    /// Fetch failed; the URL was marked processed anyway
    Failed(String),
    /// The job was cancelled before the fetch completed
    Cancelled,
}

/// Per-job dispatcher, cloned into every wave unit
#[derive(Clone)]
pub struct Dispatcher {
    job: Arc<JobContext>,
    frontier: Arc<FrontierStore>,
    gate: ConcurrencyGate,
    fetcher: Arc<dyn Fetcher>,
    emitter: Arc<dyn ResultEmitter>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        job: Arc<JobContext>,
        frontier: Arc<FrontierStore>,
        gate: ConcurrencyGate,
        fetcher: Arc<dyn Fetcher>,
        emitter: Arc<dyn ResultEmitter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            frontier,
            gate,
            fetcher,
            emitter,
            retry: RetryPolicy::none(),
            cancel,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Dispatches one URL
    pub async fn dispatch(&self, url: String) -> DispatchOutcome {
        if self.cancel.is_cancelled() {
            return DispatchOutcome::Cancelled;
        }

        if !self.job.filter.matches(&url) {
            tracing::debug!("Skipping {} (outside filter {})", url, self.job.filter.as_str());
            self.frontier.mark_skipped(&url);
            return DispatchOutcome::Skipped;
        }

        let _permit = tokio::select! {
            permit = self.gate.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return DispatchOutcome::Cancelled,
            },
            _ = self.cancel.cancelled() => return DispatchOutcome::Cancelled,
        };

        let backlink = self.frontier.backlink(&url);
        tracing::debug!("Fetching {}", url);

        let result = tokio::select! {
            result = self.fetch_with_retry(&url, backlink.as_deref()) => result,
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled { url: url.clone() }),
        };

        match result {
            Ok(page) => {
                self.frontier.mark_processed(&url);
                let new_links = self.frontier.add_links(
                    &url,
                    page.links.iter().filter(|link| !is_ignored_link(link)),
                );

                if let Err(e) = self.emitter.page(&self.job, &page) {
                    tracing::warn!("Failed to emit page {}: {}", url, e);
                }
                DispatchOutcome::Fetched { new_links }
            }
            Err(FetchError::Cancelled { .. }) => DispatchOutcome::Cancelled,
            Err(error) => {
                tracing::warn!("Fetch failed for {}: {}", url, error);
                self.frontier.mark_processed(&url);

                if let Err(e) = self.emitter.fetch_failed(&self.job, &url, &error) {
                    tracing::warn!("Failed to emit error for {}: {}", url, e);
                }
                DispatchOutcome::Failed(error.to_string())
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        url: &str,
        backlink: Option<&str>,
    ) -> Result<crate::crawler::PageResult, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetcher.fetch(url, backlink).await {
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} in {:?} (attempt {}/{}): {}",
                        url,
                        self.retry.delay,
                        attempt,
                        self.retry.max_retries,
                        e
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                result => return result,
            }
        }
    }
}
