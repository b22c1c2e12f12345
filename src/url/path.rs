use sha2::{Digest, Sha256};
use std::path::PathBuf;
use url::Url;

/// Maps a URL to its relative storage directory: `<host>/<sha256(url)>`
///
/// The host is taken in its ASCII (punycode) form. URLs without a host map
/// to the digest alone.
///
/// # Examples
///
/// ```
/// use wavecrawl::url::url_to_dirpath;
///
/// let path = url_to_dirpath("https://example.com/a").unwrap();
/// assert!(path.starts_with("example.com"));
/// ```
pub fn url_to_dirpath(url: &str) -> Result<PathBuf, url::ParseError> {
    let parsed = Url::parse(url)?;

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());

    let mut path = PathBuf::new();
    if let Some(host) = parsed.host_str() {
        path.push(host);
    }
    path.push(digest);
    Ok(path)
}
