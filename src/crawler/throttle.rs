//! Fetch throttler
//!
//! Every outbound page request goes through [`Throttler::fetch`], which
//! enforces, in order:
//! - the crawl-permission check for the target
//! - the per-domain minimum spacing (configured delay, robots crawl-delay and
//!   the adaptive autothrottle delay, whichever is largest)
//! - the global cap on requests in flight
//! - bounded retries with exponential backoff
//!
//! Permits are released on every exit path by dropping them.

use crate::config::{AutoThrottleConfig, CrawlerConfig, RetryConfig};
use crate::crawler::fetcher::{Fetch, FetchError, FetchErrorKind, RawDocument};
use crate::robots::{Permission, PermissionPolicy};
use crate::state::{initial_delay, DomainState};
use crate::url::domain_key;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use url::Url;

/// The throttling knobs taken from the crawler configuration
#[derive(Debug, Clone)]
pub struct ThrottleSettings {
    pub max_concurrent_requests: usize,
    pub download_delay: Duration,
    pub retry: RetryConfig,
    pub autothrottle: AutoThrottleConfig,
}

impl From<&CrawlerConfig> for ThrottleSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrent_requests: config.max_concurrent_requests.max(1) as usize,
            download_delay: config.download_delay(),
            retry: config.retry.clone(),
            autothrottle: config.autothrottle.clone(),
        }
    }
}

impl ThrottleSettings {
    /// Backoff before retry number `attempt` (1-based)
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
        Duration::from_millis(self.retry.backoff_base_ms.saturating_mul(factor))
    }

    /// Per-domain spacing floor for a target with the given robots crawl-delay
    ///
    /// The crawl-delay is capped at the autothrottle ceiling.
    fn spacing_floor(&self, crawl_delay: Option<Duration>) -> Duration {
        let ceiling = Duration::from_millis(self.autothrottle.max_delay_ms);
        let crawl_delay = crawl_delay.unwrap_or(Duration::ZERO).min(ceiling);
        self.download_delay.max(crawl_delay)
    }

    fn is_retryable_status(&self, status: u16) -> bool {
        (500..=599).contains(&status) || self.retry.http_codes.contains(&status)
    }
}

/// Shared gate for outbound requests
pub struct Throttler {
    fetcher: Arc<dyn Fetch>,
    permissions: Arc<dyn PermissionPolicy>,
    settings: ThrottleSettings,
    permits: Arc<Semaphore>,
    domains: StdMutex<HashMap<String, Arc<Mutex<DomainState>>>>,
}

impl Throttler {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        permissions: Arc<dyn PermissionPolicy>,
        settings: ThrottleSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_requests));
        Self {
            fetcher,
            permissions,
            settings,
            permits,
            domains: StdMutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &ThrottleSettings {
        &self.settings
    }

    /// Fetches `target`, applying permission, spacing, concurrency and retries
    ///
    /// A target that is not an http(s) URL with a host fails permanently
    /// without any network attempt, as does a target the policy denies.
    pub async fn fetch(&self, target: &Url) -> Result<RawDocument, FetchError> {
        if !matches!(target.scheme(), "http" | "https") {
            return Err(FetchError::permanent(target.as_str(), "unsupported scheme"));
        }
        let key = domain_key(target)
            .ok_or_else(|| FetchError::permanent(target.as_str(), "URL has no host"))?;

        let crawl_delay = match self.permissions.check(target).await {
            Permission::Allowed { crawl_delay } => crawl_delay,
            Permission::Denied => {
                tracing::info!("Disallowed by robots.txt: {}", target);
                return Err(FetchError::permanent(target.as_str(), "disallowed by robots.txt"));
            }
        };
        let floor = self.settings.spacing_floor(crawl_delay);

        let slot = self.domain_slot(&key, floor);
        let mut last_error = None;

        for attempt in 0..=self.settings.retry.times {
            if attempt > 0 {
                let backoff = self.settings.backoff(attempt);
                tracing::debug!("Retry {} for {} after {:?}", attempt, target, backoff);
                tokio::time::sleep(backoff).await;
            }

            let (result, latency) = self.attempt(target, &slot, floor).await;

            match result {
                Ok(doc) if (200..300).contains(&doc.status) => {
                    slot.lock().await.observe_response(
                        latency,
                        true,
                        &self.settings.autothrottle,
                        floor,
                    );
                    return Ok(doc);
                }
                Ok(doc) => {
                    slot.lock().await.observe_response(
                        latency,
                        false,
                        &self.settings.autothrottle,
                        floor,
                    );
                    let error = FetchError::permanent(
                        target.as_str(),
                        format!("HTTP status {}", doc.status),
                    )
                    .with_status(doc.status);

                    if !self.settings.is_retryable_status(doc.status) {
                        return Err(error);
                    }
                    tracing::warn!("HTTP {} from {} (attempt {})", doc.status, target, attempt + 1);
                    last_error = Some(error);
                }
                Err(error) if error.kind == FetchErrorKind::Transient => {
                    slot.lock()
                        .await
                        .observe_failure(&self.settings.autothrottle, floor);
                    tracing::warn!("{} (attempt {})", error, attempt + 1);
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error
            .unwrap_or_else(|| FetchError::transient(target.as_str(), "retries exhausted")))
    }

    /// One spaced, permit-holding request
    async fn attempt(
        &self,
        target: &Url,
        slot: &Arc<Mutex<DomainState>>,
        floor: Duration,
    ) -> (Result<RawDocument, FetchError>, Duration) {
        let permit = {
            // Holding the domain lock while waiting serializes same-domain
            // requests, so the spacing is measured between send times.
            let mut state = slot.lock().await;
            if let Some(wait) = state.time_until_next_request(Instant::now(), floor) {
                tokio::time::sleep(wait).await;
            }
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        Err(FetchError::permanent(target.as_str(), "throttler closed")),
                        Duration::ZERO,
                    )
                }
            };
            state.record_request(Instant::now());
            permit
        };

        let started = Instant::now();
        let result = self.fetcher.fetch_once(target).await;
        let latency = started.elapsed();
        drop(permit);

        (result, latency)
    }

    fn domain_slot(&self, key: &str, floor: Duration) -> Arc<Mutex<DomainState>> {
        let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        domains
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(DomainState::new(initial_delay(
                    &self.settings.autothrottle,
                    floor,
                ))))
            })
            .clone()
    }

    /// Current adaptive delay for a domain, if it has been contacted
    pub async fn current_delay(&self, key: &str) -> Option<Duration> {
        let slot = {
            let domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
            domains.get(key).cloned()
        }?;
        let delay = slot.lock().await.delay;
        Some(delay)
    }
}
