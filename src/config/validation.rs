use crate::config::types::{Config, CrawlerConfig, OutputConfig, SeedRule};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    if let Some(user_agent) = &config.user_agent {
        if user_agent.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent name cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    check_capacity("max-concurrent-jobs", config.max_concurrent_jobs)?;
    check_capacity("max-concurrent-fetches", config.max_concurrent_fetches)?;

    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.settle_delay_min_ms > config.settle_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "settle-delay-min-ms ({}) must not exceed settle-delay-max-ms ({})",
            config.settle_delay_min_ms, config.settle_delay_max_ms
        )));
    }

    Ok(())
}

fn check_capacity(name: &str, value: u32) -> Result<(), ConfigError> {
    if !(1..=100).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and 100, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.root_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "root-dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the seed rule list
///
/// Filter patterns are not compiled here: an invalid pattern fails only the
/// job it belongs to.
pub fn validate_rules(rules: &[SeedRule]) -> Result<(), ConfigError> {
    for rule in rules {
        validate_absolute_url(&rule.url)?;
        if let Some(backlink) = &rule.backlink {
            if !backlink.is_empty() {
                validate_absolute_url(backlink)?;
            }
        }
    }
    Ok(())
}

fn validate_absolute_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "URL '{}' must use http or https",
            raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!("URL '{}' has no host", raw)));
    }

    Ok(())
}
