//! Configuration module for Wavecrawl
//!
//! This module handles loading, parsing, and validating the TOML crawler
//! configuration and the seed rule file.
//!
//! # Example
//!
//! ```no_run
//! use wavecrawl::config::{load_config, load_rules};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wavecrawl.toml")).unwrap();
//! let rules = load_rules(Path::new("rules.toml")).unwrap();
//! println!("{} seeds, {} jobs at a time", rules.len(), config.crawler.max_concurrent_jobs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, RuleFile, SeedRule, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_file_hash, load_config, load_rules, load_rules_with_hash};
pub use validation::{validate, validate_rules};
