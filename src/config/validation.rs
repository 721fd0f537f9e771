use crate::config::types::{
    AutoThrottleConfig, Config, CrawlerConfig, OutputConfig, RetryConfig, SearchConfig,
    SourceEntry, UserAgentConfig,
};
use crate::extract::LayoutRegistry;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_sources(&config.sources)?;

    for layout in &config.layouts {
        for pattern in &layout.domains {
            validate_domain_pattern(pattern)?;
        }
    }

    // Compiling the registry checks every selector in every layout
    let registry = LayoutRegistry::with_overrides(&config.layouts)?;

    if let Some(search) = &config.search {
        validate_search_config(search)?;
        if registry.by_name(&search.layout).is_none() {
            return Err(ConfigError::UnknownLayout(search.layout.clone()));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.download_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "download_delay_ms must be >= 100ms, got {}ms",
            config.download_delay_ms
        )));
    }

    if config.max_pages_per_target < 1 {
        return Err(ConfigError::Validation(
            "max_pages_per_target must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.run_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs and run_timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_retry_config(&config.retry)?;
    validate_autothrottle_config(&config.autothrottle, config.download_delay_ms)?;

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.times > 10 {
        return Err(ConfigError::Validation(format!(
            "retry.times must be <= 10, got {}",
            config.times
        )));
    }

    if let Some(code) = config
        .http_codes
        .iter()
        .find(|code| !(400..=599).contains(*code))
    {
        return Err(ConfigError::Validation(format!(
            "retry.http-codes may only contain 4xx/5xx codes, got {}",
            code
        )));
    }

    Ok(())
}

fn validate_autothrottle_config(
    config: &AutoThrottleConfig,
    download_delay_ms: u64,
) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.max_delay_ms < download_delay_ms || config.max_delay_ms < config.start_delay_ms {
        return Err(ConfigError::Validation(format!(
            "autothrottle.max-delay-ms ({}) must be >= download-delay-ms and start-delay-ms",
            config.max_delay_ms
        )));
    }

    if !(config.target_concurrency > 0.0) {
        return Err(ConfigError::Validation(format!(
            "autothrottle.target-concurrency must be > 0, got {}",
            config.target_concurrency
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    // The name doubles as the robots.txt product token
    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates configured listing sources
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have a name",
                source.url
            )));
        }

        validate_http_url(&source.url, "source URL")?;

        if !seen.insert(source.url.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Source URL '{}' is listed more than once",
                source.url
            )));
        }
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.search_url, "search-url")?;
    validate_http_url(&config.trending_url, "trending-url")?;

    if config.query_param.is_empty() {
        return Err(ConfigError::Validation(
            "search.query-param cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            what, raw
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid email format: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }

    Ok(())
}
