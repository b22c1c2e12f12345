use crate::CrawlError;
use regex::Regex;

/// Link-inclusion rule of one seed job
///
/// The pattern is an unanchored regex evaluated against absolute URLs, so a
/// bare hostname such as `example\.com` matches every URL that contains it.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    regex: Regex,
}

impl LinkFilter {
    /// Compiles a filter pattern
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::InvalidFilter` if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self, CrawlError> {
        let regex = Regex::new(pattern).map_err(|source| CrawlError::InvalidFilter {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// Returns true if the URL is inside this job's crawl scope
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    /// Splits links into in-pattern and out-of-pattern subsets
    pub fn partition<'a, I>(&self, links: I) -> (Vec<&'a str>, Vec<&'a str>)
    where
        I: IntoIterator<Item = &'a String>,
    {
        links
            .into_iter()
            .map(String::as_str)
            .partition(|link| self.matches(link))
    }

    /// The source pattern
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
