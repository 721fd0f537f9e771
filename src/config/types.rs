use crate::extract::LayoutDef;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for NewsFusion
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
    #[serde(default, rename = "layout")]
    pub layouts: Vec<LayoutDef>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of requests in flight across all domains
    #[serde(rename = "max-concurrent-requests", default = "default_concurrency")]
    pub max_concurrent_requests: u32,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "download-delay-ms", default = "default_download_delay")]
    pub download_delay_ms: u64,

    /// Maximum number of pages followed per target, first page included
    #[serde(rename = "max-pages-per-target", default = "default_max_pages")]
    pub max_pages_per_target: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Hard wall-clock limit for a whole run (seconds)
    #[serde(rename = "run-timeout-secs", default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Whether robots.txt is consulted before each fetch
    #[serde(rename = "obey-robots", default = "default_true")]
    pub obey_robots: bool,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub autothrottle: AutoThrottleConfig,
}

impl CrawlerConfig {
    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Retry policy for failed fetches
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the first attempt
    #[serde(default = "default_retry_times")]
    pub times: u32,

    /// 4xx status codes that are retried (5xx are always retried)
    #[serde(rename = "http-codes", default = "default_retry_codes")]
    pub http_codes: Vec<u16>,

    /// Base backoff; attempt n waits `base * 2^(n-1)`
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base")]
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            times: default_retry_times(),
            http_codes: default_retry_codes(),
            backoff_base_ms: default_backoff_base(),
        }
    }
}

/// Adaptive per-domain delay settings
#[derive(Debug, Clone, Deserialize)]
pub struct AutoThrottleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Initial per-domain delay (milliseconds)
    #[serde(rename = "start-delay-ms", default = "default_start_delay")]
    pub start_delay_ms: u64,

    /// Ceiling for the per-domain delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Average number of requests the crawler aims to keep outstanding per domain
    #[serde(rename = "target-concurrency", default = "default_target_concurrency")]
    pub target_concurrency: f64,
}

impl Default for AutoThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_delay_ms: default_start_delay(),
            max_delay_ms: default_max_delay(),
            target_concurrency: default_target_concurrency(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Full User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Search-results feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Endpoint receiving the keyword query
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Page crawled when no keyword is given
    #[serde(rename = "trending-url")]
    pub trending_url: String,

    #[serde(rename = "query-param", default = "default_query_param")]
    pub query_param: String,

    /// Fixed parameters appended after the query, in key order
    #[serde(rename = "extra-params", default)]
    pub extra_params: BTreeMap<String, String>,

    /// Label used when an item names no publisher
    #[serde(rename = "source-label", default = "default_source_label")]
    pub source_label: String,

    /// Name of the layout used to read result pages
    #[serde(default = "default_search_layout")]
    pub layout: String,
}

/// A configured listing source, synced into storage at startup
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_concurrency() -> u32 {
    16
}

fn default_download_delay() -> u64 {
    3000
}

fn default_max_pages() -> u32 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_run_timeout() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_retry_times() -> u32 {
    3
}

fn default_retry_codes() -> Vec<u16> {
    vec![500, 502, 503, 504, 400, 403, 404, 408]
}

fn default_backoff_base() -> u64 {
    500
}

fn default_start_delay() -> u64 {
    5000
}

fn default_max_delay() -> u64 {
    60000
}

fn default_target_concurrency() -> f64 {
    1.0
}

fn default_query_param() -> String {
    "q".to_string()
}

fn default_source_label() -> String {
    "Google News".to_string()
}

fn default_search_layout() -> String {
    "google-news".to_string()
}
