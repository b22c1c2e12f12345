//! Wave orchestrator - drives one seed job's depth-limited expansion
//!
//! The orchestrator walks the job through the phases of `JobPhase`.
//!
//! Each wave is the frontier's pending set, dispatched in random order into a
//! `WaveBarrier` and fully joined before the next wave is computed. A depth
//! budget of `d` allows at most `d + 1` waves.

use crate::config::CrawlerConfig;
use crate::crawler::barrier::{WaveBarrier, WaveUnit};
use crate::crawler::dispatcher::{DispatchOutcome, Dispatcher, RetryPolicy};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::gate::ConcurrencyGate;
use crate::crawler::job::{JobContext, JobOutcome, JobReport};
use crate::output::ResultEmitter;
use crate::state::{FrontierStore, JobPhase};
use crate::FetchError;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Counters accumulated over a job's waves
#[derive(Debug, Default, Clone, Copy)]
struct WaveTally {
    fetched: usize,
    skipped: usize,
    failed: usize,
}

/// State machine running one seed job to completion
pub struct WaveOrchestrator {
    job: Arc<JobContext>,
    frontier: Arc<FrontierStore>,
    dispatcher: Dispatcher,
    emitter: Arc<dyn ResultEmitter>,
    cancel: CancellationToken,
    shuffle: bool,
    phase: JobPhase,
    remaining_depth: u32,
    waves: u32,
    tally: WaveTally,
}

impl WaveOrchestrator {
    /// Creates an orchestrator with a fresh, empty frontier
    ///
    /// # Arguments
    ///
    /// * `job` - The seed job to run
    /// * `fetcher` - The fetcher owned by this job
    /// * `emitter` - Where page results and the terminal report go
    /// * `config` - Fetch gate capacity, retry policy and wave shuffling
    /// * `cancel` - Job-scoped cancellation token
    pub fn new(
        job: Arc<JobContext>,
        fetcher: Arc<dyn Fetcher>,
        emitter: Arc<dyn ResultEmitter>,
        config: &CrawlerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let frontier = Arc::new(FrontierStore::new());
        let gate = ConcurrencyGate::new(config.max_concurrent_fetches as usize);
        let dispatcher = Dispatcher::new(
            job.clone(),
            frontier.clone(),
            gate,
            fetcher,
            emitter.clone(),
            cancel.clone(),
        )
        .with_retry(RetryPolicy::from_config(config));

        Self {
            remaining_depth: job.max_depth(),
            job,
            frontier,
            dispatcher,
            emitter,
            cancel,
            shuffle: config.shuffle_waves,
            phase: JobPhase::Init,
            waves: 0,
            tally: WaveTally::default(),
        }
    }

    /// The job's frontier
    pub fn frontier(&self) -> &Arc<FrontierStore> {
        &self.frontier
    }

    fn transition(&mut self, next: JobPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid job phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Runs the job until it reaches `Terminal`
    pub async fn run(self) -> JobReport {
        let span = tracing::info_span!(
            "job",
            job = self.job.id,
            seed = %self.job.seed(),
            driver = %self.job.driver
        );
        self.run_phases().instrument(span).await
    }

    async fn run_phases(mut self) -> JobReport {
        let started = Instant::now();
        let mut wave: Vec<String> = Vec::new();

        loop {
            match self.phase {
                JobPhase::Init => {
                    self.frontier
                        .insert_seed(self.job.seed(), self.job.seed_backlink());
                    tracing::info!("Starting job (depth {})", self.job.max_depth());
                    self.transition(JobPhase::WaveCompute);
                }
                JobPhase::WaveCompute => {
                    wave = self.frontier.pending_wave();
                    if wave.is_empty() || self.cancel.is_cancelled() {
                        self.transition(JobPhase::Done);
                    } else {
                        self.transition(JobPhase::WaveDispatch);
                    }
                }
                JobPhase::WaveDispatch => {
                    if self.shuffle {
                        wave.shuffle(&mut rand::rng());
                    }
                    tracing::info!("Wave {}: dispatching {} URLs", self.waves, wave.len());

                    let mut barrier = WaveBarrier::new(wave.len());
                    for url in wave.drain(..) {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        let dispatcher = self.dispatcher.clone();
                        barrier.dispatch(url.clone(), async move { dispatcher.dispatch(url).await });
                    }
                    if barrier.dispatched() < barrier.expected() {
                        tracing::info!(
                            "Cancelled after dispatching {} of {} URLs",
                            barrier.dispatched(),
                            barrier.expected()
                        );
                    }
                    self.waves += 1;

                    self.transition(JobPhase::WaveJoin);
                    let units = barrier.await_wave().await;
                    self.record_wave(units);

                    if self.cancel.is_cancelled() {
                        self.transition(JobPhase::Done);
                    } else {
                        self.transition(JobPhase::Advance);
                    }
                }
                JobPhase::Advance => {
                    if self.remaining_depth == 0 {
                        tracing::debug!("Depth budget exhausted");
                        self.transition(JobPhase::Done);
                        continue;
                    }
                    self.remaining_depth -= 1;

                    if self.frontier.pending_wave().is_empty() {
                        self.transition(JobPhase::Done);
                    } else {
                        self.transition(JobPhase::WaveCompute);
                    }
                }
                JobPhase::Done => {
                    self.transition(JobPhase::Terminal);
                }
                JobPhase::WaveJoin | JobPhase::Terminal => break,
            }
        }
        debug_assert!(self.phase.is_terminal(), "job left its loop in {}", self.phase);

        let report = self.report(started);
        tracing::info!(
            "Job {} after {} waves: {} fetched, {} failed, {} skipped",
            report.outcome,
            report.waves,
            report.fetched,
            report.failed,
            report.skipped
        );

        if let Err(e) = self.emitter.job_finished(&report) {
            tracing::warn!("Failed to emit job report: {}", e);
        }
        report
    }

    fn record_wave(&mut self, units: Vec<WaveUnit<DispatchOutcome>>) {
        for unit in units {
            match unit.output {
                Some(DispatchOutcome::Fetched { .. }) => self.tally.fetched += 1,
                Some(DispatchOutcome::Skipped) => self.tally.skipped += 1,
                Some(DispatchOutcome::Failed(_)) => self.tally.failed += 1,
                Some(DispatchOutcome::Cancelled) => {}
                None => {
                    tracing::error!("Dispatch of {} panicked", unit.key);
                    self.frontier.mark_processed(&unit.key);
                    self.tally.failed += 1;

                    let error = FetchError::Aborted {
                        url: unit.key.clone(),
                    };
                    if let Err(e) = self.emitter.fetch_failed(&self.job, &unit.key, &error) {
                        tracing::warn!("Failed to emit error for {}: {}", unit.key, e);
                    }
                }
            }
        }
    }

    fn report(&self, started: Instant) -> JobReport {
        let snapshot = self.frontier.snapshot();
        let outcome = if self.cancel.is_cancelled() {
            JobOutcome::Cancelled
        } else {
            JobOutcome::Completed
        };

        JobReport {
            id: self.job.id,
            seed: self.job.seed().to_string(),
            driver: self.job.driver,
            waves: self.waves,
            fetched: self.tally.fetched,
            skipped: self.tally.skipped,
            failed: self.tally.failed,
            discovered: snapshot.discovered,
            processed: snapshot.processed,
            outcome,
            elapsed: started.elapsed(),
        }
    }
}
