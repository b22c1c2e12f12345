//! Wavecrawl main entry point
//!
//! This is the command-line interface for the Wavecrawl crawl engine.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wavecrawl::config::{load_config, load_rules_with_hash, validate, Config, SeedRule};
use wavecrawl::crawler::{crawl, Driver, JobContext, JobOutcome};
use wavecrawl::output::{
    generate_markdown_report, FanoutEmitter, FileEmitter, ResultEmitter, RunSummary,
    SharedStorage, SqliteEmitter,
};
use wavecrawl::storage::{open_storage, RunStatus};

/// Wavecrawl: a depth-bounded, wave-by-wave site crawler
///
/// Every seed URL of the rule file becomes one job. A job crawls breadth
/// first, one depth level per wave, following only links that match the
/// seed's filter.
#[derive(Parser, Debug)]
#[command(name = "wavecrawl")]
#[command(version)]
#[command(about = "A depth-bounded, wave-by-wave site crawler", long_about = None)]
struct Cli {
    /// Path to the seed rule file (TOML, or CSV when named *.csv)
    #[arg(long, value_name = "FILE", required_unless_present = "stats")]
    rules: Option<PathBuf>,

    /// Path to the TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Comma separated browser profiles to crawl with
    #[arg(long, value_name = "LIST", default_value = "chromium")]
    drivers: String,

    /// Override the output root directory
    #[arg(long, value_name = "DIR")]
    output_root_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and rules and show what would be crawled
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path).map_err(|e| {
                tracing::error!("Failed to load configuration: {}", e);
                e
            })?
        }
        None => {
            let config = Config::default();
            validate(&config)?;
            config
        }
    };
    if let Some(root) = cli.output_root_dir {
        config.output.root_dir = root;
    }

    if cli.stats {
        return handle_stats(&config);
    }

    let Some(rules_path) = cli.rules else {
        return Err("--rules is required".into());
    };
    let (rules, rules_hash) = load_rules_with_hash(&rules_path).map_err(|e| {
        tracing::error!("Failed to load rules from {}: {}", rules_path.display(), e);
        e
    })?;
    tracing::info!(
        "Loaded {} seed rules from {} (hash: {})",
        rules.len(),
        rules_path.display(),
        rules_hash
    );

    let (drivers, unsupported) = Driver::parse_list(&cli.drivers);
    for error in &unsupported {
        tracing::error!("Skipping driver: {}", error);
    }
    if drivers.is_empty() {
        return Err(format!("no supported driver in '{}'", cli.drivers).into());
    }

    if cli.dry_run {
        handle_dry_run(&config, &rules, &drivers);
        return Ok(());
    }

    handle_crawl(config, rules, rules_hash, drivers).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wavecrawl=info,warn"),
            1 => EnvFilter::new("wavecrawl=debug,info"),
            2 => EnvFilter::new("wavecrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the configuration and every job
fn handle_dry_run(config: &Config, rules: &[SeedRule], drivers: &[Driver]) {
    println!("=== Wavecrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max concurrent jobs: {}", config.crawler.max_concurrent_jobs);
    println!(
        "  Max concurrent fetches per job: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Max redirects: {}", config.crawler.max_redirects);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Settle delay: {}-{}ms",
        config.crawler.settle_delay_min_ms, config.crawler.settle_delay_max_ms
    );

    if let Some(user_agent) = &config.user_agent {
        println!("\nUser Agent: {}", user_agent.name);
    }

    println!("\nOutput:");
    println!("  Root: {}", config.output.root_dir.display());
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path.display()),
        None => println!("  Database: (disabled)"),
    }

    let names: Vec<&str> = drivers.iter().map(|d| d.as_str()).collect();
    println!("\nDrivers: {}", names.join(", "));

    println!("\nSeeds ({}):", rules.len());
    let mut invalid = 0;
    for (id, rule) in rules.iter().enumerate() {
        match JobContext::new(id, rule.clone(), drivers[0]) {
            Ok(job) => println!(
                "  #{} {} (depth {}, filter {})",
                id,
                rule.url,
                rule.depth,
                job.filter.as_str()
            ),
            Err(e) => {
                invalid += 1;
                println!("  #{} {} - would fail: {}", id, rule.url, e);
            }
        }
    }

    println!(
        "\n✓ Would start {} jobs per driver ({} would fail at setup)",
        rules.len(),
        invalid
    );
}

/// Handles the --stats mode: shows statistics of the latest run
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use wavecrawl::output::{load_statistics, print_statistics};

    let Some(path) = &config.output.database_path else {
        return Err("--stats needs output.database-path in the configuration".into());
    };
    println!("Database: {}\n", path.display());

    let storage = open_storage(path)?;
    match load_statistics(&storage)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No crawl runs recorded yet."),
    }

    Ok(())
}

/// Handles the main crawl operation: one concurrent run per driver
async fn handle_crawl(
    config: Config,
    rules: Vec<SeedRule>,
    rules_hash: String,
    drivers: Vec<Driver>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight fetches");
                cancel.cancel();
            }
        });
    }

    let storage: Option<SharedStorage> = match &config.output.database_path {
        Some(path) => {
            let storage: SharedStorage = Arc::new(Mutex::new(open_storage(path)?));
            Some(storage)
        }
        None => None,
    };

    let runs = drivers.iter().map(|&driver| {
        run_driver(
            &config,
            &rules,
            &rules_hash,
            driver,
            storage.clone(),
            cancel.clone(),
        )
    });
    let results = futures::future::join_all(runs).await;

    let mut failed_drivers = 0;
    for (driver, result) in drivers.iter().zip(results) {
        match result {
            Ok(summary) => tracing::info!(
                "Driver {} finished: {} / {} jobs completed, {} pages fetched, {} failures",
                driver,
                summary.jobs_with_outcome(JobOutcome::is_success),
                summary.jobs.len(),
                summary.total_fetched(),
                summary.total_failed()
            ),
            Err(e) => {
                failed_drivers += 1;
                tracing::error!("Driver {} could not run: {}", driver, e);
            }
        }
    }

    if failed_drivers == drivers.len() {
        return Err("every driver run failed".into());
    }
    Ok(())
}

/// Runs every seed under one driver and writes its run report
async fn run_driver(
    config: &Config,
    rules: &[SeedRule],
    rules_hash: &str,
    driver: Driver,
    storage: Option<SharedStorage>,
    cancel: CancellationToken,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let started = Instant::now();
    let started_at = chrono::Utc::now().to_rfc3339();

    let files = Arc::new(FileEmitter::new(&config.output.root_dir, driver)?);
    let driver_dir = files.driver_dir().to_path_buf();
    let mut fanout = FanoutEmitter::new().with(files);

    let sqlite = match storage {
        Some(storage) => {
            let emitter = Arc::new(SqliteEmitter::start_run(storage, rules_hash, driver.as_str())?);
            fanout = fanout.with(emitter.clone());
            Some(emitter)
        }
        None => None,
    };

    tracing::info!(
        "Starting {} jobs with {} into {}",
        rules.len(),
        driver,
        driver_dir.display()
    );
    let emitter: Arc<dyn ResultEmitter> = Arc::new(fanout);
    let reports = crawl(config, rules, driver, emitter, cancel.clone()).await;

    if let Some(sqlite) = &sqlite {
        let status = if cancel.is_cancelled() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        if let Err(e) = sqlite.finish(status) {
            tracing::error!("Failed to finish run {}: {}", sqlite.run_id(), e);
        }
    }

    let mut summary = RunSummary::new(driver, rules_hash, reports);
    summary.started_at = started_at;
    summary.elapsed = started.elapsed();

    if config.output.report {
        write_report(&summary, &driver_dir.join("run_report.md"));
    }

    Ok(summary)
}

fn write_report(summary: &RunSummary, path: &Path) {
    match generate_markdown_report(summary, path) {
        Ok(()) => tracing::info!("Run report written to {}", path.display()),
        Err(e) => tracing::error!("Failed to write run report {}: {}", path.display(), e),
    }
}
