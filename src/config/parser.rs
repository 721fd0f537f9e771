use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
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
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use newsfusion::config::load_config;
///
/// let config = load_config(Path::new("newsfusion.toml")).unwrap();
/// println!("Sources: {}", config.sources.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded with every crawl run so runs can be traced back to
/// the settings they used.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG: &str = r#"
[crawler]
max-concurrent-requests = 8
download-delay-ms = 2000
max-pages-per-target = 3

[crawler.retry]
times = 2

[user-agent]
crawler-name = "NewsFusion"
crawler-version = "1.0"
contact-url = "https://example.com/bot"
contact-email = "bot@example.com"

[output]
database-path = "./news.db"

[search]
search-url = "https://news.google.com/search"
trending-url = "https://news.google.com/topstories"
extra-params = { hl = "en-IN", gl = "IN" }

[[source]]
name = "The Hindu"
url = "https://www.thehindu.com/news/"

[[source]]
name = "Times of India"
url = "https://timesofindia.indiatimes.com/news"
active = false
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_concurrent_requests, 8);
        assert_eq!(config.crawler.download_delay_ms, 2000);
        assert_eq!(config.crawler.max_pages_per_target, 3);
        assert_eq!(config.crawler.retry.times, 2);
        assert_eq!(config.user_agent.crawler_name, "NewsFusion");
        assert_eq!(config.sources.len(), 2);
        assert!(config.sources[0].active);
        assert!(!config.sources[1].active);
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = parse_config(VALID_CONFIG).unwrap();

        assert_eq!(config.crawler.run_timeout_secs, 600);
        assert!(config.crawler.obey_robots);
        assert_eq!(
            config.crawler.retry.http_codes,
            vec![500, 502, 503, 504, 400, 403, 404, 408]
        );
        assert!(config.crawler.autothrottle.enabled);
        assert_eq!(config.crawler.autothrottle.max_delay_ms, 60000);

        let search = config.search.unwrap();
        assert_eq!(search.query_param, "q");
        assert_eq!(search.layout, "google-news");
        assert_eq!(search.extra_params.get("hl").map(String::as_str), Some("en-IN"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/newsfusion.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace(
            "max-concurrent-requests = 8",
            "max-concurrent-requests = 0",
        );
        let result = parse_config(&content);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
