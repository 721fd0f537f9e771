use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use newsfusion::url::extract_domain;
///
/// let url = Url::parse("https://WWW.TheHindu.com/news/").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.thehindu.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the key requests are throttled under
///
/// The key is the lowercase host, followed by `:port` when the URL names a
/// port other than its scheme's default. Two mock servers on one loopback
/// address therefore get independent throttle slots, as do two real hosts.
///
/// # Returns
///
/// * `Some(String)` - `host` or `host:port`
/// * `None` - If the URL has no host
pub fn domain_key(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_domain_key_without_port() {
        let url = Url::parse("https://timesofindia.indiatimes.com/news").unwrap();
        assert_eq!(
            domain_key(&url),
            Some("timesofindia.indiatimes.com".to_string())
        );
    }

    #[test]
    fn test_domain_key_default_port_omitted() {
        let url = Url::parse("https://example.com:443/a").unwrap();
        assert_eq!(domain_key(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_domain_key_distinguishes_ports() {
        let a = Url::parse("http://127.0.0.1:4001/").unwrap();
        let b = Url::parse("http://127.0.0.1:4002/").unwrap();
        assert_eq!(domain_key(&a), Some("127.0.0.1:4001".to_string()));
        assert_ne!(domain_key(&a), domain_key(&b));
    }
}
