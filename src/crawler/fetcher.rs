//! HTTP fetcher implementation
//!
//! This module performs single request attempts:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a bounded redirect chain
//! - Classifying network failures as transient
//!
//! Retries, spacing and permission checks live in the throttler.

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 5;

/// A fetched page
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    pub body: String,
}

/// Whether a failed fetch may succeed if tried again later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transient,
    Permanent,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// A failed fetch
#[derive(Debug, Clone, Error)]
#[error("{kind} fetch failure for {url}: {reason}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    pub reason: String,
    /// Last HTTP status seen, if a response arrived
    pub status: Option<u16>,
}

impl FetchError {
    pub fn transient(url: &str, reason: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Transient,
            url: url.to_string(),
            reason: reason.into(),
            status: None,
        }
    }

    pub fn permanent(url: &str, reason: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Permanent,
            url: url.to_string(),
            reason: reason.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FetchErrorKind::Transient
    }
}

/// One request attempt against a target
///
/// Any HTTP response, whatever its status, is returned as `Ok`; the caller
/// decides what a status means. `Err` is reserved for failures where no
/// usable response exists.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_once(&self, target: &Url) -> Result<RawDocument, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Timeouts are taken from here
///
/// # Example
///
/// ```no_run
/// use newsfusion::config::load_config;
/// use newsfusion::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("newsfusion.toml")).unwrap();
/// let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    Client::builder()
        .user_agent(user_agent.header_value())
        .default_headers(headers)
        .timeout(crawler.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_once(&self, target: &Url) -> Result<RawDocument, FetchError> {
        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(target, &e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if status.is_success() {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_ascii_lowercase();

            // A missing header is given the benefit of the doubt
            if !content_type.is_empty() && !content_type.contains("html") {
                return Err(FetchError::permanent(
                    target.as_str(),
                    format!("expected HTML, got '{}'", content_type),
                )
                .with_status(status.as_u16()));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transient(target.as_str(), format!("reading body: {}", e)))?;

        Ok(RawDocument {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Maps a reqwest failure to a fetch error kind
///
/// Exceeding the redirect limit is permanent; timeouts, refused connections
/// and other transport problems are transient.
fn classify_reqwest_error(target: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_redirect() {
        FetchError::permanent(target.as_str(), format!("redirect error: {}", error))
    } else if error.is_builder() {
        FetchError::permanent(target.as_str(), format!("invalid request: {}", error))
    } else {
        FetchError::transient(target.as_str(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutoThrottleConfig, RetryConfig};
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> (UserAgentConfig, CrawlerConfig) {
        (
            UserAgentConfig {
                crawler_name: "NewsFusion".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/bot".to_string(),
                contact_email: "bot@example.com".to_string(),
            },
            CrawlerConfig {
                max_concurrent_requests: 4,
                download_delay_ms: 100,
                max_pages_per_target: 3,
                request_timeout_secs: 5,
                run_timeout_secs: 30,
                obey_robots: true,
                retry: RetryConfig::default(),
                autothrottle: AutoThrottleConfig::default(),
            },
        )
    }

    fn fetcher() -> HttpFetcher {
        let (ua, crawler) = create_test_config();
        HttpFetcher::new(build_http_client(&ua, &crawler).unwrap())
    }

    #[test]
    fn test_build_http_client() {
        let (ua, crawler) = create_test_config();
        assert!(build_http_client(&ua, &crawler).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/news", server.uri())).unwrap();
        let doc = fetcher().fetch_once(&url).await.unwrap();
        assert_eq!(doc.status, 200);
        assert_eq!(doc.body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let doc = fetcher().fetch_once(&url).await.unwrap();
        assert_eq!(doc.status, 503);
    }

    #[tokio::test]
    async fn test_non_html_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher().fetch_once(&url).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Permanent);
        assert_eq!(err.status, Some(200));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher().fetch_once(&url).await.unwrap_err();
        assert!(err.is_transient());
    }
}
