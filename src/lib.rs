//! NewsFusion: a polite news crawler
//!
//! This crate fetches article listings from configured news sources and from a
//! search-results feed, extracts structured fields through ordered selector
//! fallbacks, deduplicates articles by content fingerprint and persists new
//! ones to SQLite.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fingerprint;
pub mod output;
pub mod robots;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for NewsFusion operations
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunStatus,
        to: state::RunStatus,
    },

    #[error("Crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These surface to the caller of `start_crawl` before any run is created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid CSS selector '{selector}' in layout '{layout}'")]
    InvalidSelector { layout: String, selector: String },

    #[error("Unknown layout: {0}")]
    UnknownLayout(String),

    #[error("Search-feed crawl requested but no [search] section is configured")]
    MissingSearchFeed,

    #[error("Incompatible crawl request: {0}")]
    IncompatibleRequest(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for NewsFusion operations
pub type Result<T> = std::result::Result<T, FusionError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlMode, CrawlRequest, RunHandle, RunReport};
pub use fingerprint::{fingerprint, Fingerprint};
pub use state::RunStatus;
pub use storage::{SqliteStorage, StoreOutcome};
