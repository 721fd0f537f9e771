//! Robots.txt caching implementation
//!
//! Entries are keyed by origin and expire after 24 hours.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cached robots.txt data for one origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: ParsedRobots) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }
}

/// Process-wide robots.txt cache shared by every run of a coordinator
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns fresh rules for `origin`, if any
    pub fn get(&self, origin: &str) -> Option<ParsedRobots> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(origin)
            .filter(|cached| !cached.is_stale())
            .map(|cached| cached.rules.clone())
    }

    /// Stores rules for `origin`, replacing any previous entry
    pub fn insert(&self, origin: &str, rules: ParsedRobots) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(origin.to_string(), CachedRobots::new(rules));
        }
    }

    #[cfg(test)]
    fn backdate(&self, origin: &str, age: Duration) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(cached) = entries.get_mut(origin) {
            cached.fetched_at = Utc::now() - age;
        }
    }
}
