use crate::config::AutoThrottleConfig;
use std::time::{Duration, Instant};

/// Tracks the state of a domain during crawling
///
/// This structure maintains the per-domain information the throttler needs:
/// when the last request went out and the current adaptive delay.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Number of requests made to this domain
    pub request_count: u32,

    /// Timestamp of the last request to this domain
    pub last_request_time: Option<Instant>,

    /// Current adaptive delay between requests
    pub delay: Duration,
}

impl DomainState {
    /// Creates a new DomainState starting at `initial_delay`
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            request_count: 0,
            last_request_time: None,
            delay: initial_delay,
        }
    }

    /// Calculates the time until the next request can be made
    ///
    /// The required spacing is the larger of `floor` (the configured minimum,
    /// possibly raised by robots.txt) and the adaptive delay.
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant, floor: Duration) -> Option<Duration> {
        let last = self.last_request_time?;
        let required = floor.max(self.delay);
        let elapsed = now.saturating_duration_since(last);

        if elapsed < required {
            Some(required - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was made to this domain
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Adjusts the adaptive delay after a response arrived
    ///
    /// The target delay is `latency / target_concurrency`; the new delay is the
    /// mean of the current and target delays, never below the target, clamped
    /// to `[floor, max_delay]`. A non-success response may not lower the delay.
    pub fn observe_response(
        &mut self,
        latency: Duration,
        success: bool,
        config: &AutoThrottleConfig,
        floor: Duration,
    ) {
        if !config.enabled {
            return;
        }

        let target = latency.div_f64(config.target_concurrency);
        let averaged = (self.delay + target) / 2;
        let next = averaged
            .max(target)
            .max(floor)
            .min(Duration::from_millis(config.max_delay_ms));

        if !success && next < self.delay {
            return;
        }

        self.delay = next;
    }

    /// Doubles the adaptive delay after a network-level failure
    pub fn observe_failure(&mut self, config: &AutoThrottleConfig, floor: Duration) {
        if !config.enabled {
            return;
        }

        self.delay = (self.delay * 2)
            .max(floor)
            .min(Duration::from_millis(config.max_delay_ms));
    }
}

/// Returns the delay a fresh domain starts with
pub fn initial_delay(config: &AutoThrottleConfig, floor: Duration) -> Duration {
    if config.enabled {
        floor.max(Duration::from_millis(config.start_delay_ms))
    } else {
        floor
    }
}
