//! URL handling module for Wavecrawl
//!
//! This module provides the per-job link filter, the fixed denylist of
//! links that are never followed, and the mapping from URLs to storage
//! directories.

mod filter;
mod ignore;
mod path;

pub use filter::LinkFilter;
pub use ignore::is_ignored_link;
pub use path::url_to_dirpath;
