use crate::config::types::{Config, RuleFile, SeedRule};
use crate::config::validation::{validate, validate_rules};
use crate::ConfigError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the seed rule list from a rule file
///
/// Files ending in `.csv` are read as CSV with a `url,filter,depth,backlink`
/// header; every other file is read as TOML with one `[[rule]]` table per
/// seed:
///
/// ```toml
/// [[rule]]
/// url = "https://example.com/"
/// filter = "example\\.com"
/// depth = 1
/// ```
pub fn load_rules(path: &Path) -> Result<Vec<SeedRule>, ConfigError> {
    let rules = if is_csv(path) {
        parse_csv_rules(std::fs::File::open(path)?)?
    } else {
        let content = std::fs::read_to_string(path)?;
        let file: RuleFile = toml::from_str(&content)?;
        file.rule
    };
    validate_rules(&rules)?;
    Ok(rules)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// One CSV row; only `url` is required, empty cells count as absent
#[derive(Debug, Deserialize)]
struct CsvRule {
    url: String,
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    depth: Option<u32>,
    #[serde(default)]
    backlink: Option<String>,
}

impl From<CsvRule> for SeedRule {
    fn from(row: CsvRule) -> Self {
        SeedRule {
            url: row.url,
            filter: row.filter,
            depth: row.depth.unwrap_or(0),
            backlink: row.backlink,
        }
    }
}

fn parse_csv_rules(reader: impl std::io::Read) -> Result<Vec<SeedRule>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rules = Vec::new();
    for row in reader.deserialize::<CsvRule>() {
        rules.push(row?.into());
    }
    Ok(rules)
}

/// Computes a SHA-256 hash of a file's content
///
/// Used to identify which rule file produced a crawl run.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_file_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads the seed rules and returns them together with the rule file hash
pub fn load_rules_with_hash(path: &Path) -> Result<(Vec<SeedRule>, String), ConfigError> {
    let rules = load_rules(path)?;
    let hash = compute_file_hash(path)?;
    Ok((rules, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_file(
            r#"
[crawler]
max-concurrent-jobs = 2
max-concurrent-fetches = 5
max-retries = 1

[output]
root-dir = "/tmp/wavecrawl"
database-path = "/tmp/wavecrawl.db"
"#,
        );
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_concurrent_jobs, 2);
        assert_eq!(config.crawler.max_concurrent_fetches, 5);
        assert_eq!(config.crawler.max_retries, 1);
        // Unset keys keep their defaults
        assert_eq!(config.crawler.fetch_timeout_secs, 30);
        assert!(config.output.database_path.is_some());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_file("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawler.max_concurrent_jobs, 3);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/wavecrawl.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_file("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_file("[crawler]\nmax-concurrent-fetches = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_rules() {
        let file = create_temp_file(
            r#"
[[rule]]
url = "https://example.com/"
filter = "example\\.com"
depth = 1

[[rule]]
url = "https://other.org/start"
backlink = "https://example.com/"
"#,
        );
        let rules = load_rules(file.path()).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].filter.as_deref(), Some(r"example\.com"));
        assert_eq!(rules[0].depth, 1);
        assert_eq!(rules[1].depth, 0);
        assert_eq!(rules[1].backlink.as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn test_load_rules_rejects_relative_url() {
        let file = create_temp_file("[[rule]]\nurl = \"/relative\"\n");
        let result = load_rules(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_load_csv_rules() {
        let file = create_temp_csv(
            "url,filter,depth,backlink\n\
             https://example.com/,example\\.com,2,https://ref.org/\n\
             https://other.org/start,,,\n",
        );
        let rules = load_rules(file.path()).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].filter.as_deref(), Some(r"example\.com"));
        assert_eq!(rules[0].depth, 2);
        assert_eq!(rules[0].backlink.as_deref(), Some("https://ref.org/"));

        assert_eq!(rules[1], SeedRule::new("https://other.org/start"));
    }

    #[test]
    fn test_load_csv_rules_with_missing_columns() {
        let file = create_temp_csv("url,depth\nhttps://example.com/,1\nhttps://example.org/, \n");
        let rules = load_rules(file.path()).unwrap();

        assert_eq!(
            rules,
            vec![
                SeedRule::new("https://example.com/").with_depth(1),
                SeedRule::new("https://example.org/"),
            ]
        );
    }

    #[test]
    fn test_load_csv_rules_errors() {
        let file = create_temp_csv("filter,depth\nexample,1\n");
        assert!(matches!(load_rules(file.path()), Err(ConfigError::Csv(_))));

        let file = create_temp_csv("url,depth\nhttps://example.com/,deep\n");
        assert!(matches!(load_rules(file.path()), Err(ConfigError::Csv(_))));

        let file = create_temp_csv("url\nftp://example.com/\n");
        assert!(matches!(load_rules(file.path()), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_compute_file_hash() {
        let file = create_temp_file("test content");
        let hash1 = compute_file_hash(file.path()).unwrap();
        let hash2 = compute_file_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_file("content 1");
        let file2 = create_temp_file("content 2");

        assert_ne!(
            compute_file_hash(file1.path()).unwrap(),
            compute_file_hash(file2.path()).unwrap()
        );
    }
}
