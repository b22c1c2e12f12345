use regex::Regex;
use std::sync::LazyLock;

/// Documents, images and non-navigable schemes that are never enumerated as links
static IGNORED_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^.*\.pdf$|^.*\.docx?$|^.*\.xlsx?$|^.*\.pptx?$|^.*\.jpe?g$|^.*\.png$|^.*\.gif$|^.*\.webp$|^mailto:.*$|^tel:.*$|^javascript:.*$",
    )
    .expect("ignored link pattern is valid")
});

/// Returns true if the absolute URL is on the fixed link denylist
///
/// Extensions and schemes match case-insensitively.
///
/// # Examples
///
/// ```
/// use wavecrawl::url::is_ignored_link;
///
/// assert!(is_ignored_link("https://example.com/report.pdf"));
/// assert!(is_ignored_link("mailto:someone@example.com"));
/// assert!(!is_ignored_link("https://example.com/report"));
/// ```
pub fn is_ignored_link(url: &str) -> bool {
    IGNORED_LINK.is_match(url)
}
