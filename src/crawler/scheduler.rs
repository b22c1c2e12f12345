//! Job scheduler - admits seed jobs under the top-level concurrency bound
//!
//! This module handles:
//! - Top-level concurrency limiting of seed jobs via a `ConcurrencyGate`
//! - Building an isolated execution context per job (fetcher, frontier, gate)
//! - Collecting one `JobReport` per seed, whatever happened to the job
//!
//! A job's permit is acquired before the job is spawned and is held by the
//! job's task until its orchestrator reaches `Terminal`. Seeds are admitted
//! in a random order when `shuffle-waves` is set, in input order otherwise;
//! reports always come back in input order.

use crate::config::{CrawlerConfig, SeedRule};
use crate::crawler::driver::Driver;
use crate::crawler::fetcher::FetcherFactory;
use crate::crawler::gate::ConcurrencyGate;
use crate::crawler::job::{JobContext, JobOutcome, JobReport};
use crate::crawler::orchestrator::WaveOrchestrator;
use crate::output::ResultEmitter;
use futures::FutureExt;
use rand::seq::SliceRandom;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs seed jobs with at most `max_concurrent_jobs` active at once
///
/// The scheduler never aborts because one job failed: every seed yields a
/// report, either from its orchestrator or describing why it never started.
pub struct JobScheduler {
    gate: ConcurrencyGate,
    factory: Arc<dyn FetcherFactory>,
    emitter: Arc<dyn ResultEmitter>,
    config: CrawlerConfig,
    cancel: CancellationToken,
    shuffle: bool,
}

impl JobScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `factory` - Opens one fetcher per job
    /// * `emitter` - Receives the results of every job
    pub fn new(
        config: &CrawlerConfig,
        factory: Arc<dyn FetcherFactory>,
        emitter: Arc<dyn ResultEmitter>,
    ) -> Self {
        Self {
            gate: ConcurrencyGate::new(config.max_concurrent_jobs as usize),
            factory,
            emitter,
            config: config.clone(),
            cancel: CancellationToken::new(),
            shuffle: config.shuffle_waves,
        }
    }

    /// Ties the scheduler to a run-level cancellation token
    ///
    /// Every job receives a child of this token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The top-level job gate
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Runs every seed under `driver` and returns the reports in input order
    pub async fn run(&self, rules: &[SeedRule], driver: Driver) -> Vec<JobReport> {
        tracing::info!(
            "Scheduling {} seeds for {} ({} jobs at a time)",
            rules.len(),
            driver,
            self.gate.capacity()
        );

        let mut reports = Vec::with_capacity(rules.len());
        let mut jobs = JoinSet::new();

        let mut order: Vec<usize> = (0..rules.len()).collect();
        if self.shuffle {
            order.shuffle(&mut rand::rng());
        }

        for id in order {
            let rule = &rules[id];
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = self.gate.acquire() => permit.ok(),
            };
            let Some(permit) = permit else {
                tracing::debug!("Job {} ({}) cancelled before start", id, rule.url);
                reports.push(finish_early(
                    self.emitter.as_ref(),
                    JobReport {
                        outcome: JobOutcome::Cancelled,
                        ..JobReport::failed(id, &rule.url, driver, "")
                    },
                ));
                continue;
            };

            let orchestrator = match self.prepare(id, rule, driver) {
                Ok(orchestrator) => orchestrator,
                Err(report) => {
                    reports.push(finish_early(self.emitter.as_ref(), report));
                    continue;
                }
            };

            let seed = rule.url.clone();
            let emitter = self.emitter.clone();
            jobs.spawn(async move {
                let report = match AssertUnwindSafe(orchestrator.run()).catch_unwind().await {
                    Ok(report) => report,
                    Err(_) => {
                        tracing::error!("Job {} ({}) panicked", id, seed);
                        finish_early(
                            emitter.as_ref(),
                            JobReport::failed(id, &seed, driver, "job panicked"),
                        )
                    }
                };
                drop(permit);
                report
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!("Job task did not complete: {}", e),
            }
        }

        reports.sort_by_key(|r| r.id);
        reports
    }

    /// Builds the isolated context of one job
    ///
    /// Setup failures (bad filter, fetcher that cannot be opened) fail this
    /// job only.
    fn prepare(
        &self,
        id: usize,
        rule: &SeedRule,
        driver: Driver,
    ) -> Result<WaveOrchestrator, JobReport> {
        let job = JobContext::new(id, rule.clone(), driver).map_err(|e| {
            tracing::error!("Job {} ({}) failed to start: {}", id, rule.url, e);
            JobReport::failed(id, &rule.url, driver, e.to_string())
        })?;
        let job = Arc::new(job);

        let fetcher = self.factory.open(driver).map_err(|e| {
            tracing::error!("Job {} ({}) could not open a fetcher: {}", id, rule.url, e);
            JobReport::failed(id, &rule.url, driver, e.to_string())
        })?;

        Ok(WaveOrchestrator::new(
            job,
            fetcher,
            self.emitter.clone(),
            &self.config,
            self.cancel.child_token(),
        ))
    }
}

/// Emits the report of a job whose orchestrator never produced one
fn finish_early(emitter: &dyn ResultEmitter, report: JobReport) -> JobReport {
    if let Err(e) = emitter.job_finished(&report) {
        tracing::warn!("Failed to emit report of job {}: {}", report.id, e);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::{RecordingEmitter, ScriptedFetcher, SharedFactory};
    use crate::crawler::Fetcher;
    use crate::CrawlError;

    fn config(jobs: u32) -> CrawlerConfig {
        CrawlerConfig {
            max_concurrent_jobs: jobs,
            ..CrawlerConfig::default()
        }
    }

    struct FailingFactory;

    impl FetcherFactory for FailingFactory {
        fn open(&self, driver: Driver) -> Result<Arc<dyn Fetcher>, CrawlError> {
            Err(CrawlError::UnsupportedDriver(driver.to_string()))
        }
    }

    #[tokio::test]
    async fn test_one_report_per_seed_in_input_order() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let scheduler = JobScheduler::new(
            &config(2),
            Arc::new(SharedFactory(fetcher.clone())),
            Arc::new(RecordingEmitter::default()),
        );
        let rules = vec![
            SeedRule::new("https://a.com/"),
            SeedRule::new("https://b.com/"),
            SeedRule::new("https://c.com/"),
        ];

        let reports = scheduler.run(&rules, Driver::Chromium).await;

        let seeds: Vec<&str> = reports.iter().map(|r| r.seed.as_str()).collect();
        assert_eq!(seeds, vec!["https://a.com/", "https://b.com/", "https://c.com/"]);
        assert!(reports.iter().all(|r| r.outcome.is_success()));
        assert_eq!(fetcher.fetched().len(), 3);
        assert_eq!(scheduler.gate().available(), 2);
    }

    #[tokio::test]
    async fn test_bad_filter_fails_only_that_job() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let scheduler = JobScheduler::new(
            &config(1),
            Arc::new(SharedFactory(fetcher.clone())),
            Arc::new(RecordingEmitter::default()),
        );
        let rules = vec![
            SeedRule::new("https://a.com/").with_filter("(broken"),
            SeedRule::new("https://b.com/"),
        ];

        let reports = scheduler.run(&rules, Driver::Chromium).await;

        assert!(matches!(reports[0].outcome, JobOutcome::Failed(_)));
        assert_eq!(reports[1].outcome, JobOutcome::Completed);
        assert_eq!(fetcher.fetched(), vec!["https://b.com/".to_string()]);
    }

    #[tokio::test]
    async fn test_factory_failure_is_reported() {
        let emitter = Arc::new(RecordingEmitter::default());
        let scheduler = JobScheduler::new(&config(1), Arc::new(FailingFactory), emitter.clone());

        let reports = scheduler
            .run(&[SeedRule::new("https://a.com/")], Driver::Webkit)
            .await;

        assert!(matches!(reports[0].outcome, JobOutcome::Failed(_)));
        assert_eq!(emitter.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_starts_no_jobs() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let scheduler = JobScheduler::new(
            &config(1),
            Arc::new(SharedFactory(fetcher.clone())),
            Arc::new(RecordingEmitter::default()),
        )
        .with_cancellation(cancel);

        let reports = scheduler
            .run(&[SeedRule::new("https://a.com/")], Driver::Chromium)
            .await;

        assert_eq!(reports[0].outcome, JobOutcome::Cancelled);
        assert!(fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_jobs_reach_the_emitter() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let emitter = Arc::new(RecordingEmitter::default());
        let scheduler = JobScheduler::new(
            &config(1),
            Arc::new(SharedFactory(Arc::new(ScriptedFetcher::new()))),
            emitter.clone(),
        )
        .with_cancellation(cancel);
        let rules = vec![
            SeedRule::new("https://a.com/"),
            SeedRule::new("https://b.com/"),
        ];

        scheduler.run(&rules, Driver::Chromium).await;

        let emitted = emitter.reports.lock().unwrap();
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().all(|r| r.outcome == JobOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_setup_failures_reach_the_emitter() {
        let emitter = Arc::new(RecordingEmitter::default());
        let scheduler = JobScheduler::new(
            &config(1),
            Arc::new(SharedFactory(Arc::new(ScriptedFetcher::new()))),
            emitter.clone(),
        );
        let rules = vec![
            SeedRule::new("https://a.com/").with_filter("(bad"),
            SeedRule::new("https://b.com/"),
        ];

        let reports = scheduler.run(&rules, Driver::Chromium).await;

        let emitted = emitter.reports.lock().unwrap();
        assert_eq!(emitted.len(), 2);
        let failed = emitted.iter().find(|r| r.id == 0).unwrap();
        assert!(matches!(failed.outcome, JobOutcome::Failed(_)));
        assert_eq!(failed.outcome, reports[0].outcome);
    }

    #[tokio::test]
    async fn test_admits_in_input_order_without_shuffle() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let config = CrawlerConfig {
            shuffle_waves: false,
            ..config(1)
        };
        let scheduler = JobScheduler::new(
            &config,
            Arc::new(SharedFactory(fetcher.clone())),
            Arc::new(RecordingEmitter::default()),
        );
        let seeds: Vec<String> = (0..6).map(|i| format!("https://s{}.com/", i)).collect();
        let rules: Vec<SeedRule> = seeds.iter().map(SeedRule::new).collect();

        scheduler.run(&rules, Driver::Chromium).await;

        assert_eq!(fetcher.fetched(), seeds);
    }

    #[tokio::test]
    async fn test_shuffled_admission_reports_in_input_order() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let scheduler = JobScheduler::new(
            &config(1),
            Arc::new(SharedFactory(fetcher.clone())),
            Arc::new(RecordingEmitter::default()),
        );
        let seeds: Vec<String> = (0..8).map(|i| format!("https://s{}.com/", i)).collect();
        let rules: Vec<SeedRule> = seeds.iter().map(SeedRule::new).collect();

        let reports = scheduler.run(&rules, Driver::Chromium).await;

        let ids: Vec<usize> = reports.iter().map(|r| r.id).collect();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
        let reported: Vec<&str> = reports.iter().map(|r| r.seed.as_str()).collect();
        assert_eq!(reported, seeds.iter().map(String::as_str).collect::<Vec<_>>());

        let mut fetched = fetcher.fetched();
        fetched.sort();
        let mut expected = seeds.clone();
        expected.sort();
        assert_eq!(fetched, expected);
    }
}
