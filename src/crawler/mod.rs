//! Crawler module for page fetching and run orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of single attempts
//! - Throttling: permission checks, per-domain spacing, the global
//!   concurrency cap and retries
//! - Pagination traversal with depth and cycle guards
//! - Run coordination and run handles

mod coordinator;
mod fetcher;
mod paginator;
mod run;
mod throttle;

pub use coordinator::{search_target_url, Coordinator, CrawlMode, CrawlRequest};
pub use fetcher::{build_http_client, Fetch, FetchError, FetchErrorKind, HttpFetcher, RawDocument};
pub use paginator::{Paginator, StopReason};
pub use run::{get_run_status, RunHandle, RunReport};
pub use throttle::{ThrottleSettings, Throttler};

use crate::config::Config;
use crate::FusionError;

/// Runs a complete crawl and waits for it to finish
///
/// This is the simplest entry point. It will:
/// 1. Open storage and sync configured sources
/// 2. Start a run for `request`
/// 3. Wait for a terminal status
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `config_hash` - Recorded on the run row
/// * `request` - What to crawl
pub async fn crawl(
    config: Config,
    config_hash: String,
    request: CrawlRequest,
) -> Result<RunReport, FusionError> {
    let coordinator = Coordinator::new(config, config_hash)?;
    let handle = coordinator.start_crawl(request).await?;
    Ok(handle.wait(None).await)
}
