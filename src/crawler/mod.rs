//! Crawler module: the crawl orchestration engine
//!
//! This module contains the core crawling logic, including:
//! - Concurrency gates and the per-wave barrier
//! - Per-URL dispatch and the per-seed wave orchestrator
//! - The top-level job scheduler
//! - The fetch capability trait with its HTTP implementation and HTML extraction

mod barrier;
mod dispatcher;
mod driver;
mod fetcher;
mod gate;
mod job;
mod orchestrator;
mod page;
mod parser;
mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use barrier::{WaveBarrier, WaveUnit};
pub use dispatcher::{DispatchOutcome, Dispatcher, RetryPolicy};
pub use driver::Driver;
pub use fetcher::{
    build_http_client, FetchSettings, Fetcher, FetcherFactory, HttpFetcher, HttpFetcherFactory,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use job::{JobContext, JobOutcome, JobReport};
pub use orchestrator::WaveOrchestrator;
pub use page::PageResult;
pub use parser::{normalize_text, parse_page, ParsedPage};
pub use scheduler::JobScheduler;

use crate::config::{Config, SeedRule};
use crate::output::ResultEmitter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Crawls every seed under one driver with the HTTP fetcher
///
/// This is the main entry point for a crawl. It will:
/// 1. Build an HTTP fetcher factory from the configuration
/// 2. Schedule one job per seed under the job concurrency limit
/// 3. Return one report per seed, in input order
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `rules` - The seed rules
/// * `driver` - Browser profile to present
/// * `emitter` - Receives page results, failures and job reports
/// * `cancel` - Run-level cancellation token
pub async fn crawl(
    config: &Config,
    rules: &[SeedRule],
    driver: Driver,
    emitter: Arc<dyn ResultEmitter>,
    cancel: CancellationToken,
) -> Vec<JobReport> {
    let settings = FetchSettings::from_config(&config.crawler, config.user_agent.as_ref());
    let factory = Arc::new(HttpFetcherFactory::new(settings));

    JobScheduler::new(&config.crawler, factory, emitter)
        .with_cancellation(cancel)
        .run(rules, driver)
        .await
}
