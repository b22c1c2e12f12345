//! In-memory fetcher and emitter shared by the crawler unit tests

use crate::crawler::{Driver, Fetcher, FetcherFactory, JobContext, JobReport, PageResult};
use crate::output::{OutputResult, ResultEmitter};
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fetcher serving a fixed link graph
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    graph: HashMap<String, Vec<String>>,
    failures: HashSet<String>,
    panics: HashSet<String>,
    flaky: Mutex<HashMap<String, usize>>,
    delay: Duration,
    pub(crate) fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub(crate) peak_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.graph
            .insert(url.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    pub(crate) fn failing(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    /// Times out on the first `times` fetches of `url`, then serves it
    pub(crate) fn flaky(self, url: &str, times: usize) -> Self {
        self.flaky.lock().unwrap().insert(url.to_string(), times);
        self
    }

    pub(crate) fn panicking(mut self, url: &str) -> Self {
        self.panics.insert(url.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, backlink: Option<&str>) -> Result<PageResult, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panics.contains(url) {
            panic!("scripted panic for {}", url);
        }
        if let Some(left) = self.flaky.lock().unwrap().get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                });
            }
        }
        if self.failures.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }

        let mut page = PageResult::new(url).with_backlink(backlink);
        for link in self.graph.get(url).into_iter().flatten() {
            page = page.with_link(link.clone());
        }
        Ok(page)
    }
}

/// Factory handing out one shared scripted fetcher
pub(crate) struct SharedFactory(pub(crate) Arc<ScriptedFetcher>);

impl FetcherFactory for SharedFactory {
    fn open(&self, _driver: Driver) -> Result<Arc<dyn Fetcher>, CrawlError> {
        Ok(self.0.clone())
    }
}

/// Emitter recording every call
#[derive(Default)]
pub(crate) struct RecordingEmitter {
    pub(crate) pages: Mutex<Vec<PageResult>>,
    pub(crate) failures: Mutex<Vec<String>>,
    pub(crate) reports: Mutex<Vec<JobReport>>,
}

impl ResultEmitter for RecordingEmitter {
    fn page(&self, _job: &JobContext, page: &PageResult) -> OutputResult<()> {
        self.pages.lock().unwrap().push(page.clone());
        Ok(())
    }

    fn fetch_failed(&self, _job: &JobContext, url: &str, _error: &FetchError) -> OutputResult<()> {
        self.failures.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn job_finished(&self, report: &JobReport) -> OutputResult<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}
