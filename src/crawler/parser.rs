//! HTML extraction for fetched pages
//!
//! This module turns a document into the fields of a `PageResult`:
//! - Title, meta keywords, meta description
//! - Visible body text
//! - Outbound links from visible, enabled anchors
//! - Script resource URLs

use crate::url::is_ignored_link;
use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use url::Url;

static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+").expect("newline pattern is valid"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Elements whose text never reaches the rendered body text
const NON_RENDERED: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that end a line of rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: String,
    pub keywords: String,
    pub description: String,
    pub body_text: String,

    /// Absolute outbound links
    pub links: BTreeSet<String>,

    /// Absolute `script[src]` URLs in document order
    pub scripts: Vec<String>,
}

/// Parses a document fetched from `page_url`
///
/// # Link Extraction Rules
///
/// **Include:** `<a href>` elements that are visible and enabled, resolved
/// against `base_url`.
///
/// **Exclude:**
/// - anchors that are hidden (`hidden`, `aria-hidden="true"`, inline
///   `display:none` / `visibility:hidden`, or inside a hidden ancestor)
/// - anchors that are disabled (`disabled`, `aria-disabled="true"`)
/// - fragment-only and `data:` hrefs, non-HTTP(S) results
/// - links on the fixed ignore list (documents, images, `mailto:`, `tel:`, `javascript:`)
/// - the page's own URL (any of `own_urls`)
///
/// # Example
///
/// ```
/// use wavecrawl::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &base_url, &["https://example.com/"]);
/// assert_eq!(parsed.title, "Test");
/// assert!(parsed.links.contains("https://example.com/page"));
/// ```
pub fn parse_page(html: &str, base_url: &Url, own_urls: &[&str]) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        keywords: extract_meta(&document, "keywords"),
        description: extract_meta(&document, "description"),
        body_text: extract_body_text(&document),
        links: extract_links(&document, base_url, own_urls),
        scripts: extract_scripts(&document, base_url),
    }
}

/// Collapses whitespace the way extracted fields are stored
///
/// Trims, turns every run of line breaks into the two-character sequence
/// `\n`, then collapses remaining whitespace runs to single spaces.
///
/// ```
/// use wavecrawl::crawler::normalize_text;
///
/// assert_eq!(normalize_text("  a\r\n\n b \t c "), "a\\n b c");
/// ```
pub fn normalize_text(raw: &str) -> String {
    let text = raw.trim().replace('\r', "\n");
    let text = NEWLINE_RUNS.replace_all(&text, "\\n");
    WHITESPACE_RUNS.replace_all(&text, " ").into_owned()
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn extract_title(document: &Html) -> String {
    let Some(title_selector) = selector("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn extract_meta(document: &Html, name: &str) -> String {
    let Some(meta_selector) = selector(&format!("meta[name=\"{}\"]", name)) else {
        return String::new();
    };

    document
        .select(&meta_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(normalize_text)
        .unwrap_or_default()
}

fn extract_body_text(document: &Html) -> String {
    let Some(body_selector) = selector("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut text = String::new();
    collect_rendered_text(body, &mut text);
    normalize_text(&text)
}

/// A pending step of the rendered-text walk
enum TextStep<'a> {
    Text(&'a str),
    Open(ElementRef<'a>),
    LineBreak,
}

/// Appends the rendered text under `root` in document order
///
/// Walks with an explicit stack, so arbitrarily deep markup cannot exhaust
/// the thread's stack.
fn collect_rendered_text(root: ElementRef<'_>, out: &mut String) {
    let mut stack = Vec::new();
    push_children(root, &mut stack);

    while let Some(step) = stack.pop() {
        let element = match step {
            TextStep::Text(text) => {
                out.push_str(text);
                continue;
            }
            TextStep::LineBreak => {
                out.push('\n');
                continue;
            }
            TextStep::Open(element) => element,
        };

        let name = element.value().name();
        if NON_RENDERED.contains(&name) || is_hidden(element.value()) {
            continue;
        }
        if name == "br" {
            out.push('\n');
            continue;
        }

        if BLOCK_ELEMENTS.contains(&name) {
            stack.push(TextStep::LineBreak);
        }
        push_children(element, &mut stack);
    }
}

/// Pushes the text and element children of `element`, last child first
fn push_children<'a>(element: ElementRef<'a>, stack: &mut Vec<TextStep<'a>>) {
    stack.extend(element.children().rev().filter_map(|node| {
        match node.value().as_text() {
            Some(text) => Some(TextStep::Text(&**text)),
            None => ElementRef::wrap(node).map(TextStep::Open),
        }
    }));
}

fn extract_links(document: &Html, base_url: &Url, own_urls: &[&str]) -> BTreeSet<String> {
    let mut links = BTreeSet::new();
    let Some(anchor_selector) = selector("a[href]") else {
        return links;
    };

    for anchor in document.select(&anchor_selector) {
        if !is_visible_and_enabled(anchor) {
            continue;
        }

        let Some(link) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if own_urls.contains(&link.as_str()) || is_ignored_link(&link) {
            continue;
        }
        links.insert(link);
    }

    links
}

fn extract_scripts(document: &Html, base_url: &Url) -> Vec<String> {
    let mut scripts = Vec::new();
    let Some(script_selector) = selector("script[src]") else {
        return scripts;
    };

    for element in document.select(&script_selector) {
        if let Some(src) = element
            .value()
            .attr("src")
            .and_then(|src| resolve_link(src, base_url))
        {
            if !scripts.contains(&src) {
                scripts.push(src);
            }
        }
    }

    scripts
}

fn is_visible_and_enabled(anchor: ElementRef<'_>) -> bool {
    let element = anchor.value();
    if element.attr("disabled").is_some() || element.attr("aria-disabled") == Some("true") {
        return false;
    }

    !is_hidden(element)
        && !anchor
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_hidden(ancestor.value()))
}

fn is_hidden(element: &Element) -> bool {
    if element.attr("hidden").is_some() || element.attr("aria-hidden") == Some("true") {
        return true;
    }

    element
        .attr("style")
        .map(|style| {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            style.contains("display:none") || style.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

/// Resolves an href to an absolute HTTP(S) URL
///
/// Returns None for empty, fragment-only and `data:` hrefs, unparsable
/// values, and non-HTTP(S) results.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') || href.starts_with("data:") {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
