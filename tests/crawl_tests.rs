//! Integration tests for crawl orchestration
//!
//! These tests drive jobs through the public API with an in-memory fetcher
//! serving a fixed link graph, so every run is deterministic and offline.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wavecrawl::config::{CrawlerConfig, SeedRule};
use wavecrawl::crawler::{
    Driver, Fetcher, FetcherFactory, JobContext, JobOutcome, JobReport, JobScheduler, PageResult,
    WaveOrchestrator,
};
use wavecrawl::output::{FileEmitter, OutputResult, ResultEmitter};
use wavecrawl::{CrawlError, FetchError};

/// One recorded fetch
#[derive(Debug, Clone)]
struct FetchRecord {
    url: String,
    backlink: Option<String>,
    started: Instant,
    finished: Instant,
}

/// Fetcher serving a fixed link graph and recording every call
#[derive(Default)]
struct GraphFetcher {
    graph: HashMap<String, Vec<String>>,
    failures: HashSet<String>,
    delay: Duration,
    log: Mutex<Vec<FetchRecord>>,
}

impl GraphFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.graph
            .insert(url.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn log(&self) -> Vec<FetchRecord> {
        self.log.lock().unwrap().clone()
    }

    fn fetched_urls(&self) -> Vec<String> {
        self.log().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Fetcher for GraphFetcher {
    async fn fetch(&self, url: &str, backlink: Option<&str>) -> Result<PageResult, FetchError> {
        let started = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.lock().unwrap().push(FetchRecord {
            url: url.to_string(),
            backlink: backlink.map(str::to_string),
            started,
            finished: Instant::now(),
        });

        if self.failures.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            });
        }

        let mut page = PageResult::new(url).with_backlink(backlink);
        page.title = format!("Title of {}", url);
        for link in self.graph.get(url).into_iter().flatten() {
            page = page.with_link(link.clone());
        }
        Ok(page)
    }
}

struct GraphFactory(Arc<GraphFetcher>);

impl FetcherFactory for GraphFactory {
    fn open(&self, _driver: Driver) -> Result<Arc<dyn Fetcher>, CrawlError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct Collector {
    pages: Mutex<Vec<PageResult>>,
    failures: Mutex<Vec<String>>,
    reports: Mutex<Vec<JobReport>>,
}

impl ResultEmitter for Collector {
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

fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        max_concurrent_jobs: 3,
        max_concurrent_fetches: 3,
        settle_delay_min_ms: 0,
        settle_delay_max_ms: 0,
        retry_delay_ms: 0,
        ..CrawlerConfig::default()
    }
}

fn job(rule: SeedRule) -> Arc<JobContext> {
    Arc::new(JobContext::new(0, rule, Driver::Chromium).expect("valid rule"))
}

fn sorted(mut urls: Vec<String>) -> Vec<String> {
    urls.sort();
    urls
}

#[tokio::test]
async fn test_depth_zero_fetches_only_the_seed() {
    let fetcher = Arc::new(
        GraphFetcher::new().page("https://example.com/", &["https://example.com/a"]),
    );
    let collector = Arc::new(Collector::default());

    let orchestrator = WaveOrchestrator::new(
        job(SeedRule::new("https://example.com/")),
        fetcher.clone(),
        collector.clone(),
        &test_config(),
        CancellationToken::new(),
    );
    let frontier = orchestrator.frontier().clone();
    let report = orchestrator.run().await;

    assert_eq!(fetcher.fetched_urls(), vec!["https://example.com/"]);
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.waves, 1);
    assert!(frontier.is_discovered("https://example.com/a"));
    assert!(!frontier.is_processed("https://example.com/a"));
}

#[tokio::test]
async fn test_filtered_expansion_scenario() {
    let fetcher = Arc::new(
        GraphFetcher::new()
            .page(
                "https://example.com/",
                &[
                    "https://example.com/a",
                    "https://example.com/b",
                    "https://other.com/x",
                ],
            )
            .page("https://example.com/a", &["https://example.com/deeper"]),
    );
    let collector = Arc::new(Collector::default());
    let rule = SeedRule::new("https://example.com/")
        .with_filter(r"example\.com")
        .with_depth(1);

    let orchestrator = WaveOrchestrator::new(
        job(rule),
        fetcher.clone(),
        collector.clone(),
        &test_config(),
        CancellationToken::new(),
    );
    let frontier = orchestrator.frontier().clone();
    let report = orchestrator.run().await;

    let log = fetcher.log();
    assert_eq!(log[0].url, "https://example.com/");
    assert_eq!(
        sorted(log[1..].iter().map(|r| r.url.clone()).collect()),
        vec!["https://example.com/a", "https://example.com/b"]
    );

    // Filtered out: discovered, never fetched
    assert!(frontier.is_discovered("https://other.com/x"));
    assert!(frontier.is_skipped("https://other.com/x"));
    // Depth budget exhausted before the third wave
    assert!(frontier.is_discovered("https://example.com/deeper"));
    assert!(!frontier.is_processed("https://example.com/deeper"));

    assert_eq!(report.waves, 2);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(collector.reports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_url_is_fetched_twice() {
    // Every page links to every other page and to the seed
    let urls = [
        "https://example.com/",
        "https://example.com/1",
        "https://example.com/2",
        "https://example.com/3",
    ];
    let mut graph = GraphFetcher::new();
    for url in urls {
        graph = graph.page(url, &urls);
    }
    let fetcher = Arc::new(graph);
    let rule = SeedRule::new("https://example.com/").with_depth(5);

    let orchestrator = WaveOrchestrator::new(
        job(rule),
        fetcher.clone(),
        Arc::new(Collector::default()),
        &test_config(),
        CancellationToken::new(),
    );
    let frontier = orchestrator.frontier().clone();
    let report = orchestrator.run().await;

    let fetched = fetcher.fetched_urls();
    let unique: HashSet<_> = fetched.iter().collect();
    assert_eq!(fetched.len(), unique.len());
    assert_eq!(fetched.len(), 4);
    assert!(frontier.is_consistent());
    // The graph is exhausted after two waves
    assert_eq!(report.waves, 2);
}

#[tokio::test]
async fn test_failure_inside_wave_does_not_stop_it() {
    let children: Vec<String> = (1..=5).map(|i| format!("https://example.com/{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    let fetcher = Arc::new(
        GraphFetcher::new()
            .page("https://example.com/", &child_refs)
            .page("https://example.com/1", &["https://example.com/next"])
            .failing("https://example.com/3"),
    );
    let collector = Arc::new(Collector::default());
    let rule = SeedRule::new("https://example.com/").with_depth(2);

    let orchestrator = WaveOrchestrator::new(
        job(rule),
        fetcher.clone(),
        collector.clone(),
        &test_config(),
        CancellationToken::new(),
    );
    let frontier = orchestrator.frontier().clone();
    let report = orchestrator.run().await;

    assert_eq!(
        collector.failures.lock().unwrap().clone(),
        vec!["https://example.com/3"]
    );
    assert!(frontier.is_processed("https://example.com/3"));
    // The wave after the failing one still ran
    assert!(fetcher
        .fetched_urls()
        .contains(&"https://example.com/next".to_string()));
    assert_eq!(report.waves, 3);
    assert_eq!(report.fetched, 6);
    assert_eq!(report.failed, 1);
    assert_eq!(report.outcome, JobOutcome::Completed);
}

#[tokio::test]
async fn test_backlink_is_first_discoverer() {
    let fetcher = Arc::new(
        GraphFetcher::new()
            .page(
                "https://example.com/",
                &["https://example.com/a", "https://example.com/b"],
            )
            .page("https://example.com/a", &["https://example.com/shared"])
            .page("https://example.com/b", &["https://example.com/shared"]),
    );
    let rule = SeedRule::new("https://example.com/").with_depth(2);

    let orchestrator = WaveOrchestrator::new(
        job(rule),
        fetcher.clone(),
        Arc::new(Collector::default()),
        &test_config(),
        CancellationToken::new(),
    );
    let frontier = orchestrator.frontier().clone();
    orchestrator.run().await;

    let backlink = frontier
        .backlink("https://example.com/shared")
        .expect("discovered URL has a backlink");
    assert!(backlink == "https://example.com/a" || backlink == "https://example.com/b");

    let shared = fetcher
        .log()
        .into_iter()
        .find(|r| r.url == "https://example.com/shared")
        .expect("shared page fetched");
    assert_eq!(shared.backlink.as_deref(), Some(backlink.as_str()));
}

#[tokio::test]
async fn test_wave_without_eligible_urls_terminates() {
    // Every discovered link is outside the filter
    let fetcher = Arc::new(GraphFetcher::new().page(
        "https://example.com/",
        &["https://other.com/1", "https://other.com/2"],
    ));
    let rule = SeedRule::new("https://example.com/").with_depth(3);

    let orchestrator = WaveOrchestrator::new(
        job(rule),
        fetcher.clone(),
        Arc::new(Collector::default()),
        &test_config(),
        CancellationToken::new(),
    );
    let report = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("job must not hang on an empty wave");

    assert_eq!(fetcher.fetched_urls(), vec!["https://example.com/"]);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.outcome, JobOutcome::Completed);
}

#[tokio::test]
async fn test_ignored_links_are_never_fetched() {
    let fetcher = Arc::new(GraphFetcher::new().page(
        "https://example.com/",
        &[
            "https://example.com/report.pdf",
            "https://example.com/photo.JPG",
            "https://example.com/page",
        ],
    ));
    let rule = SeedRule::new("https://example.com/").with_depth(1);

    let orchestrator = WaveOrchestrator::new(
        job(rule),
        fetcher.clone(),
        Arc::new(Collector::default()),
        &test_config(),
        CancellationToken::new(),
    );
    let frontier = orchestrator.frontier().clone();
    orchestrator.run().await;

    assert!(!frontier.is_discovered("https://example.com/report.pdf"));
    assert_eq!(
        sorted(fetcher.fetched_urls()),
        vec!["https://example.com/", "https://example.com/page"]
    );
}

#[tokio::test]
async fn test_job_limit_one_runs_jobs_back_to_back() {
    let fetcher = Arc::new(
        GraphFetcher::new()
            .page("https://first.com/", &["https://first.com/a", "https://first.com/b"])
            .page("https://second.com/", &["https://second.com/a"])
            .with_delay(Duration::from_millis(20)),
    );
    let collector = Arc::new(Collector::default());
    let config = CrawlerConfig {
        max_concurrent_jobs: 1,
        ..test_config()
    };
    let rules = vec![
        SeedRule::new("https://first.com/").with_depth(1),
        SeedRule::new("https://second.com/").with_depth(1),
    ];

    let scheduler = JobScheduler::new(
        &config,
        Arc::new(GraphFactory(fetcher.clone())),
        collector.clone(),
    );
    let reports = scheduler.run(&rules, Driver::Chromium).await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome == JobOutcome::Completed));

    let log = fetcher.log();
    let span = |host: &str| {
        let records = log.iter().filter(|r| r.url.starts_with(host));
        let start = records.clone().map(|r| r.started).min().unwrap();
        let end = records.map(|r| r.finished).max().unwrap();
        (start, end)
    };
    let (first_start, first_end) = span("https://first.com/");
    let (second_start, second_end) = span("https://second.com/");
    assert!(
        first_end <= second_start || second_end <= first_start,
        "jobs overlapped"
    );
}

#[tokio::test]
async fn test_bad_rule_fails_only_its_job() {
    let fetcher = Arc::new(GraphFetcher::new());
    let collector = Arc::new(Collector::default());
    let rules = vec![
        SeedRule::new("https://example.com/").with_filter("(unclosed"),
        SeedRule::new("https://example.org/"),
    ];

    let scheduler = JobScheduler::new(
        &test_config(),
        Arc::new(GraphFactory(fetcher.clone())),
        collector.clone(),
    );
    let reports = scheduler.run(&rules, Driver::Firefox).await;

    assert!(matches!(reports[0].outcome, JobOutcome::Failed(_)));
    assert_eq!(reports[1].outcome, JobOutcome::Completed);
    assert_eq!(fetcher.fetched_urls(), vec!["https://example.org/"]);
}

#[tokio::test]
async fn test_cancelled_run_reports_every_seed() {
    let fetcher = Arc::new(GraphFetcher::new());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let rules = vec![
        SeedRule::new("https://example.com/"),
        SeedRule::new("https://example.org/"),
    ];

    let scheduler = JobScheduler::new(
        &test_config(),
        Arc::new(GraphFactory(fetcher.clone())),
        Arc::new(Collector::default()),
    )
    .with_cancellation(cancel);
    let reports = scheduler.run(&rules, Driver::Chromium).await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome == JobOutcome::Cancelled));
    assert!(fetcher.fetched_urls().is_empty());
}

#[tokio::test]
async fn test_results_land_in_driver_directory() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(GraphFetcher::new().page(
        "https://example.com/",
        &["https://example.com/a", "https://other.com/x"],
    ));
    let emitter = Arc::new(FileEmitter::new(dir.path(), Driver::Webkit).unwrap());
    let rules = vec![SeedRule::new("https://example.com/").with_depth(1)];

    let scheduler = JobScheduler::new(
        &test_config(),
        Arc::new(GraphFactory(fetcher)),
        emitter.clone(),
    );
    let reports = scheduler.run(&rules, Driver::Webkit).await;
    assert_eq!(reports[0].fetched, 2);

    let driver_dir = dir.path().join("webkit");
    let processed = std::fs::read_to_string(driver_dir.join("all_processed_urls.txt")).unwrap();
    assert_eq!(
        sorted(processed.lines().map(str::to_string).collect()),
        vec!["https://example.com/", "https://example.com/a"]
    );
    let external =
        std::fs::read_to_string(driver_dir.join("all_external_link_urls.txt")).unwrap();
    assert_eq!(external, "https://other.com/x\n");
    assert!(driver_dir.join("page").join("example.com").is_dir());
}
