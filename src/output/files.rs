//! File-tree result emitter
//!
//! Layout under `<root>/<driver>/`:
//!
//! | Path | Content |
//! |------|---------|
//! | `all_processed_urls.txt` | one fetched URL per line |
//! | `all_redirected_urls.txt` | JSON lines `{url, location}` |
//! | `all_error_urls.txt` | one failed URL per line |
//! | `all_link_urls.txt` | JSON lines `{url, backlink}` |
//! | `all_internal_link_urls.txt` | links inside the job's filter |
//! | `all_external_link_urls.txt` | links outside the job's filter |
//! | `all_summaries.txt` | JSON lines, one per page |
//! | `page/<host>/<sha256>/` | `content.html`, `links.txt`, `internal_links.txt`, `external_links.txt`, `js_urls.txt` |
//! | `js/<host>/<sha256>/script.js` | captured script bodies |

use crate::crawler::{Driver, JobContext, JobReport, PageResult};
use crate::output::traits::{OutputError, OutputResult, ResultEmitter};
use crate::url::url_to_dirpath;
use crate::FetchError;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const PROCESSED_URLS: &str = "all_processed_urls.txt";
const REDIRECTED_URLS: &str = "all_redirected_urls.txt";
const ERROR_URLS: &str = "all_error_urls.txt";
const LINK_URLS: &str = "all_link_urls.txt";
const INTERNAL_LINK_URLS: &str = "all_internal_link_urls.txt";
const EXTERNAL_LINK_URLS: &str = "all_external_link_urls.txt";
const SUMMARIES: &str = "all_summaries.txt";

#[derive(Serialize)]
struct RedirectLine<'a> {
    url: &'a str,
    location: &'a str,
}

#[derive(Serialize)]
struct LinkLine<'a> {
    url: &'a str,
    backlink: &'a str,
}

#[derive(Serialize)]
struct ScriptLine<'a> {
    url: &'a str,
    directory: String,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    url: &'a str,
    title: &'a str,
    keywords: &'a str,
    description: &'a str,
    #[serde(rename = "bodyText")]
    body_text: &'a str,
    backlink: Option<&'a str>,
    directory: String,
}

/// Writes results of one driver's run into a directory tree
pub struct FileEmitter {
    driver_dir: PathBuf,
    // Serializes appends to the shared `all_*` files
    write_lock: Mutex<()>,
}

impl FileEmitter {
    /// Creates `<root>/<driver>/` and an emitter writing into it
    pub fn new(root: &Path, driver: Driver) -> OutputResult<Self> {
        let driver_dir = root.join(driver.as_str());
        fs::create_dir_all(&driver_dir)?;
        Ok(Self {
            driver_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn driver_dir(&self) -> &Path {
        &self.driver_dir
    }

    /// Creates the record directory of `url` under `kind`
    ///
    /// Falls back to `<kind>/__<uuid>` when the hashed directory cannot be
    /// created.
    fn record_dir(&self, kind: &str, url: &str) -> OutputResult<PathBuf> {
        let base = self.driver_dir.join(kind);
        let preferred = url_to_dirpath(url).map(|rel| base.join(rel));

        if let Ok(path) = &preferred {
            match fs::create_dir_all(path) {
                Ok(()) => return Ok(path.clone()),
                Err(source) => {
                    let collision = OutputError::DirectoryCollision {
                        path: path.clone(),
                        source,
                    };
                    tracing::warn!("{}; using a unique directory instead", collision);
                }
            }
        }

        let fallback = base.join(format!("__{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&fallback)?;
        Ok(fallback)
    }

    fn write_page(&self, job: &JobContext, page: &PageResult) -> OutputResult<()> {
        let (internal, external) = job.filter.partition(&page.links);

        let page_dir = self.record_dir("page", &page.url)?;
        fs::write(page_dir.join("content.html"), &page.content)?;
        write_lines(&page_dir.join("links.txt"), page.links.iter().map(String::as_str))?;
        write_lines(&page_dir.join("internal_links.txt"), internal.iter().copied())?;
        write_lines(&page_dir.join("external_links.txt"), external.iter().copied())?;

        let mut script_lines = Vec::with_capacity(page.scripts.len());
        for (script_url, body) in &page.scripts {
            let script_dir = self.record_dir("js", script_url)?;
            fs::write(script_dir.join("script.js"), body)?;
            script_lines.push(serde_json::to_string(&ScriptLine {
                url: script_url,
                directory: script_dir.display().to_string(),
            })?);
        }
        write_lines(
            &page_dir.join("js_urls.txt"),
            script_lines.iter().map(String::as_str),
        )?;

        self.append(PROCESSED_URLS, [page.url.as_str()])?;
        self.append(
            SUMMARIES,
            [serde_json::to_string(&SummaryLine {
                url: &page.url,
                title: &page.title,
                keywords: &page.keywords,
                description: &page.description,
                body_text: &page.body_text,
                backlink: page.backlink.as_deref(),
                directory: page_dir.display().to_string(),
            })?],
        )?;

        let mut link_lines = Vec::with_capacity(page.links.len());
        for link in &page.links {
            link_lines.push(serde_json::to_string(&LinkLine {
                url: link,
                backlink: &page.url,
            })?);
        }
        self.append(LINK_URLS, link_lines)?;
        self.append(INTERNAL_LINK_URLS, internal)?;
        self.append(EXTERNAL_LINK_URLS, external)?;

        let mut redirect_lines = Vec::with_capacity(page.redirects.len());
        for (url, location) in &page.redirects {
            redirect_lines.push(serde_json::to_string(&RedirectLine { url, location })?);
        }
        self.append(REDIRECTED_URLS, redirect_lines)?;

        Ok(())
    }

    fn append<I, S>(&self, file: &str, lines: I) -> OutputResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.driver_dir.join(file))?;
        for line in lines {
            writeln!(out, "{}", line.as_ref())?;
        }
        Ok(())
    }
}

fn write_lines<'a>(path: &Path, lines: impl Iterator<Item = &'a str>) -> OutputResult<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

impl ResultEmitter for FileEmitter {
    fn page(&self, job: &JobContext, page: &PageResult) -> OutputResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_page(job, page)
    }

    fn fetch_failed(&self, _job: &JobContext, url: &str, _error: &FetchError) -> OutputResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.append(ERROR_URLS, [url])
    }

    fn job_finished(&self, report: &JobReport) -> OutputResult<()> {
        tracing::debug!(
            "Job {} ({}) finished: {}",
            report.id,
            report.seed,
            report.outcome
        );
        Ok(())
    }
}
