/// Checks if a host matches a layout domain pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact match: "thehindu.com" matches only "thehindu.com"
/// 2. Wildcard match: "*.indiatimes.com" matches the bare domain and any
///    subdomain, e.g. "timesofindia.indiatimes.com"
///
/// Comparison ignores ASCII case on both sides.
///
/// # Examples
///
/// ```
/// use newsfusion::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.thehindu.com", "www.thehindu.com"));
/// assert!(matches_wildcard("*.thehindu.com", "thehindu.com"));
/// assert!(!matches_wildcard("*.thehindu.com", "nothehindu.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .map_or(false, |prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("thehindu.com", "thehindu.com"));
        assert!(!matches_wildcard("thehindu.com", "www.thehindu.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_subdomains() {
        assert!(matches_wildcard("*.indiatimes.com", "indiatimes.com"));
        assert!(matches_wildcard(
            "*.indiatimes.com",
            "timesofindia.indiatimes.com"
        ));
        assert!(matches_wildcard("*.indiatimes.com", "a.b.indiatimes.com"));
    }

    #[test]
    fn test_wildcard_no_partial_label_match() {
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
        assert!(!matches_wildcard("*.example.com", ""));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_wildcard("*.TheHindu.com", "WWW.THEHINDU.COM"));
        assert!(matches_wildcard("news.google.com", "News.Google.com"));
    }

    #[test]
    fn test_loopback_pattern() {
        assert!(matches_wildcard("127.0.0.1", "127.0.0.1"));
        assert!(!matches_wildcard("127.0.0.1", "127.0.0.2"));
    }
}
