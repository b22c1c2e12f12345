//! Browser profiles a crawl can run under

use crate::CrawlError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Browser variant whose traffic profile the fetcher presents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Chromium,
    Firefox,
    Webkit,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }

    /// Default User-Agent header of the profile
    pub fn user_agent(&self) -> &'static str {
        match self {
            Self::Chromium => {
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            }
            Self::Firefox => {
                "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0"
            }
            Self::Webkit => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15"
            }
        }
    }

    /// `Accept` header sent for navigations
    pub fn accept(&self) -> &'static str {
        match self {
            Self::Chromium => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
            }
            Self::Firefox => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            Self::Webkit => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        }
    }

    /// `Accept-Language` header sent for navigations
    pub fn accept_language(&self) -> &'static str {
        match self {
            Self::Firefox => "en-US,en;q=0.5",
            _ => "en-US,en;q=0.9",
        }
    }

    /// Parses a comma separated driver list such as `chromium,firefox`
    ///
    /// Unknown names do not spoil the rest of the list: they are returned as
    /// `UnsupportedDriver` errors next to the recognized drivers. Duplicates
    /// are dropped; order is preserved.
    pub fn parse_list(list: &str) -> (Vec<Driver>, Vec<CrawlError>) {
        let mut drivers = Vec::new();
        let mut errors = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name.parse::<Driver>() {
                Ok(driver) if !drivers.contains(&driver) => drivers.push(driver),
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }
        (drivers, errors)
    }
}

impl FromStr for Driver {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            "webkit" => Ok(Self::Webkit),
            _ => Err(CrawlError::UnsupportedDriver(s.to_string())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
