//! Configuration module for NewsFusion
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use newsfusion::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("newsfusion.toml")).unwrap();
//! println!("Per-domain delay: {}ms", config.crawler.download_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AutoThrottleConfig, Config, CrawlerConfig, OutputConfig, RetryConfig, SearchConfig,
    SourceEntry, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
