//! Fetch capability
//!
//! This module defines the seam between the orchestration engine and the
//! component that turns a URL into a `PageResult`, plus the HTTP
//! implementation used by the binary:
//! - Per-job HTTP sessions with their own cookie store
//! - Manual redirect following with redirect capture
//! - Script resource capture
//! - A randomized settle delay after every fetch

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::driver::Driver;
use crate::crawler::page::PageResult;
use crate::crawler::parser::parse_page;
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Turns one URL into extracted page data
///
/// Implementations must release any per-request resources before returning,
/// on success and on failure alike.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, recording `backlink` as the page that led to it
    async fn fetch(&self, url: &str, backlink: Option<&str>) -> Result<PageResult, FetchError>;
}

/// Opens one isolated fetcher per crawl job
///
/// Fetchers are never shared between jobs, so cookies, cache and history of
/// one seed's crawl cannot leak into another's.
pub trait FetcherFactory: Send + Sync {
    fn open(&self, driver: Driver) -> Result<Arc<dyn Fetcher>, CrawlError>;
}

/// Tunables of the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_redirects: u32,
    pub settle_delay_min: Duration,
    pub settle_delay_max: Duration,
    pub capture_scripts: bool,
    pub user_agent: Option<String>,
}

impl FetchSettings {
    pub fn from_config(crawler: &CrawlerConfig, user_agent: Option<&UserAgentConfig>) -> Self {
        Self {
            timeout: Duration::from_secs(crawler.fetch_timeout_secs),
            max_redirects: crawler.max_redirects,
            settle_delay_min: Duration::from_millis(crawler.settle_delay_min_ms),
            settle_delay_max: Duration::from_millis(crawler.settle_delay_max_ms),
            capture_scripts: crawler.capture_scripts,
            user_agent: user_agent.map(|ua| ua.name.clone()),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default(), None)
    }
}

/// Builds an HTTP client presenting the given driver's profile
///
/// Redirects are not followed by the client; the fetcher follows them itself
/// so every hop can be recorded.
pub fn build_http_client(driver: Driver, settings: &FetchSettings) -> Result<Client, reqwest::Error> {
    let user_agent = settings
        .user_agent
        .clone()
        .unwrap_or_else(|| driver.user_agent().to_string());

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(driver.accept()));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(driver.accept_language()),
    );

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(settings.timeout)
        .connect_timeout(settings.timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none()) // Handle redirects manually
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Final response of a navigation after all redirect hops
struct Navigation {
    final_url: Url,
    body: String,
    redirects: BTreeMap<String, String>,
}

/// HTTP implementation of the fetch capability
///
/// Each instance owns its own client and cookie store, i.e. one browsing
/// session.
pub struct HttpFetcher {
    client: Client,
    settings: FetchSettings,
}

impl HttpFetcher {
    pub fn new(driver: Driver, settings: FetchSettings) -> Result<Self, CrawlError> {
        let client = build_http_client(driver, &settings)?;
        Ok(Self { client, settings })
    }

    async fn fetch_page(&self, url: &str, backlink: Option<&str>) -> Result<PageResult, FetchError> {
        let navigation = self.navigate(url).await?;

        let own_urls = [url, navigation.final_url.as_str()];
        let parsed = parse_page(&navigation.body, &navigation.final_url, &own_urls);

        let scripts = if self.settings.capture_scripts {
            self.capture_scripts(&parsed.scripts).await
        } else {
            BTreeMap::new()
        };

        Ok(PageResult {
            url: url.to_string(),
            title: parsed.title,
            keywords: parsed.keywords,
            description: parsed.description,
            content: navigation.body,
            body_text: parsed.body_text,
            links: parsed.links,
            redirects: navigation.redirects,
            scripts,
            backlink: backlink.filter(|b| !b.is_empty()).map(str::to_string),
        })
    }

    /// Follows redirects manually (max `max_redirects` hops)
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 3xx with `Location` | hop recorded, followed |
    /// | Revisited URL | `RedirectLoop` |
    /// | Too many hops | `RedirectLimit` |
    /// | Other non-2xx | `Status` |
    /// | Timeout | `Timeout` |
    async fn navigate(&self, url: &str) -> Result<Navigation, FetchError> {
        let mut current = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let mut visited = HashSet::from([current.to_string()]);
        let mut redirects = BTreeMap::new();

        for _ in 0..=self.settings.max_redirects {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| classify_error(url, e))?;
            let status = response.status();

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if let (true, Some(location)) = (status.is_redirection(), location) {
                redirects.insert(current.to_string(), location.clone());

                let next = current.join(&location).map_err(|e| FetchError::InvalidUrl {
                    url: location.clone(),
                    message: e.to_string(),
                })?;
                if !visited.insert(next.to_string()) {
                    return Err(FetchError::RedirectLoop {
                        url: url.to_string(),
                    });
                }

                tracing::debug!("Redirect {} -> {}", current, next);
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response.text().await.map_err(|e| classify_error(url, e))?;
            return Ok(Navigation {
                final_url: current,
                body,
                redirects,
            });
        }

        Err(FetchError::RedirectLimit {
            url: url.to_string(),
        })
    }

    /// Downloads script resources; failures are skipped, first capture wins
    async fn capture_scripts(&self, sources: &[String]) -> BTreeMap<String, String> {
        let mut scripts = BTreeMap::new();

        for src in sources {
            if scripts.contains_key(src) {
                continue;
            }
            match self.client.get(src.as_str()).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => {
                        scripts.insert(src.clone(), body);
                    }
                    Err(e) => tracing::debug!("Failed to read script {}: {}", src, e),
                },
                Ok(response) => {
                    tracing::debug!("Script {} returned HTTP {}", src, response.status())
                }
                Err(e) => tracing::debug!("Failed to fetch script {}: {}", src, e),
            }
        }

        scripts
    }

    /// Waits a random time within the configured settle window
    async fn settle(&self) {
        let min = self.settings.settle_delay_min;
        let max = self.settings.settle_delay_max.max(min);
        if max.is_zero() {
            return;
        }

        let delay = if min == max {
            min
        } else {
            let millis = rand::rng().random_range(min.as_millis()..=max.as_millis());
            Duration::from_millis(millis as u64)
        };
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, backlink: Option<&str>) -> Result<PageResult, FetchError> {
        let result = self.fetch_page(url, backlink).await;
        self.settle().await;
        result
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Opens a fresh `HttpFetcher` (and so a fresh session) for every job
#[derive(Debug, Clone, Default)]
pub struct HttpFetcherFactory {
    settings: FetchSettings,
}

impl HttpFetcherFactory {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }
}

impl FetcherFactory for HttpFetcherFactory {
    fn open(&self, driver: Driver) -> Result<Arc<dyn Fetcher>, CrawlError> {
        Ok(Arc::new(HttpFetcher::new(driver, self.settings.clone())?))
    }
}
