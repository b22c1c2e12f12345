//! Extracted state of one fetched page

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Everything a fetch capability extracts from one page
///
/// Produced once per successful fetch and handed to the result emitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageResult {
    /// The URL that was requested
    pub url: String,

    /// Document title
    pub title: String,

    /// Normalized `<meta name="keywords">` content
    pub keywords: String,

    /// Normalized `<meta name="description">` content
    pub description: String,

    /// Raw document markup
    pub content: String,

    /// Normalized visible body text
    #[serde(rename = "bodyText")]
    pub body_text: String,

    /// Absolute outbound links, already stripped of ignored links and the page itself
    pub links: BTreeSet<String>,

    /// Redirect source -> `Location` for every 3xx hop of the navigation
    pub redirects: BTreeMap<String, String>,

    /// Script resource URL -> body, first capture wins
    pub scripts: BTreeMap<String, String>,

    /// Page on which this URL was first discovered
    pub backlink: Option<String>,
}

impl PageResult {
    /// Creates an empty result for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Adds an outbound link
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.insert(link.into());
        self
    }

    /// Sets the backlink
    pub fn with_backlink(mut self, backlink: Option<&str>) -> Self {
        self.backlink = backlink.map(str::to_string);
        self
    }
}
