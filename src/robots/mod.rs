//! Robots.txt handling module
//!
//! This module provides the crawl-permission check consulted before every
//! fetch. robots.txt is fetched once per origin, cached for 24 hours, and
//! treated as allow-all when it is missing or unreachable.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Outcome of a permission check for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The target may be fetched, optionally no faster than `crawl_delay`
    Allowed { crawl_delay: Option<Duration> },
    Denied,
}

impl Permission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// A source's crawl-permission policy
#[async_trait::async_trait]
pub trait PermissionPolicy: Send + Sync {
    async fn check(&self, target: &Url) -> Permission;
}

/// Policy that permits every target, used when `obey-robots = false`
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait::async_trait]
impl PermissionPolicy for AllowAll {
    async fn check(&self, _target: &Url) -> Permission {
        Permission::Allowed { crawl_delay: None }
    }
}

/// Policy backed by each origin's robots.txt
pub struct RobotsPolicy {
    client: reqwest::Client,
    product_token: String,
    cache: RobotsCache,
    fetch_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RobotsPolicy {
    /// Creates a policy that fetches robots.txt with `client`
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client carrying the crawler's User-Agent
    /// * `product_token` - Name matched against `User-agent:` groups
    pub fn new(client: reqwest::Client, product_token: &str) -> Self {
        Self {
            client,
            product_token: product_token.to_string(),
            cache: RobotsCache::new(),
            fetch_locks: StdMutex::new(HashMap::new()),
        }
    }

    async fn rules_for(&self, target: &Url) -> ParsedRobots {
        let origin = target.origin().ascii_serialization();

        if let Some(rules) = self.cache.get(&origin) {
            return rules;
        }

        // One fetch per origin; concurrent checks wait for it and reuse the entry
        let lock = self.fetch_lock(&origin);
        let _guard = lock.lock().await;
        if let Some(rules) = self.cache.get(&origin) {
            return rules;
        }

        let rules = fetch_robots(&self.client, &origin).await;
        self.cache.insert(&origin, rules.clone());
        rules
    }

    fn fetch_lock(&self, origin: &str) -> Arc<Mutex<()>> {
        let mut locks = self.fetch_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(origin.to_string()).or_default().clone()
    }
}

#[async_trait::async_trait]
impl PermissionPolicy for RobotsPolicy {
    async fn check(&self, target: &Url) -> Permission {
        let rules = self.rules_for(target).await;

        if rules.is_allowed(target, &self.product_token) {
            Permission::Allowed {
                crawl_delay: rules.crawl_delay(&self.product_token),
            }
        } else {
            tracing::info!("robots.txt disallows {}", target);
            Permission::Denied
        }
    }
}

/// Fetches and parses `<origin>/robots.txt`
///
/// Any non-success status or network failure yields allow-all rules.
pub async fn fetch_robots(client: &reqwest::Client, origin: &str) -> ParsedRobots {
    let robots_url = format!("{}/robots.txt", origin);

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}; allowing all", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::debug!("{} returned {}; allowing all", robots_url, status);
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}; allowing all", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_allow_all_policy() {
        let target = Url::parse("https://example.com/news").unwrap();
        assert!(AllowAll.check(&target).await.is_allowed());
    }

    #[tokio::test]
    async fn test_robots_policy_denies_disallowed_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private\nCrawl-delay: 4"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let policy = RobotsPolicy::new(reqwest::Client::new(), "NewsFusion");
        let base = Url::parse(&server.uri()).unwrap();

        let open = policy.check(&base.join("/news").unwrap()).await;
        assert_eq!(
            open,
            Permission::Allowed {
                crawl_delay: Some(Duration::from_secs(4))
            }
        );

        // Second lookup is served from the cache
        let closed = policy.check(&base.join("/private/x").unwrap()).await;
        assert_eq!(closed, Permission::Denied);
    }

    #[tokio::test]
    async fn test_concurrent_checks_fetch_robots_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private")
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let policy = RobotsPolicy::new(reqwest::Client::new(), "NewsFusion");
        let base = Url::parse(&server.uri()).unwrap();
        let a = base.join("/news/a").unwrap();
        let b = base.join("/news/b").unwrap();
        let c = base.join("/private/c").unwrap();

        let (a, b, c) = tokio::join!(policy.check(&a), policy.check(&b), policy.check(&c));
        assert!(a.is_allowed());
        assert!(b.is_allowed());
        assert_eq!(c, Permission::Denied);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let policy = RobotsPolicy::new(reqwest::Client::new(), "NewsFusion");
        let target = Url::parse(&server.uri()).unwrap().join("/anything").unwrap();
        assert_eq!(
            policy.check(&target).await,
            Permission::Allowed { crawl_delay: None }
        );
    }

    #[tokio::test]
    async fn test_unreachable_robots_allows_all() {
        // Nothing listens on port 9 of the loopback interface
        let rules = fetch_robots(&reqwest::Client::new(), "http://127.0.0.1:9").await;
        let target = Url::parse("http://127.0.0.1:9/x").unwrap();
        assert!(rules.is_allowed(&target, "NewsFusion"));
    }
}
