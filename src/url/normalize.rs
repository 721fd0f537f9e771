use url::Url;

/// Query parameters that never change which page is served
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ved", "oc"];

/// Produces the canonical form of a URL used by pagination cycle guards
///
/// # Normalization Steps
///
/// 1. Lowercase the host and remove a `www.` prefix
/// 2. Collapse empty path segments and remove a trailing slash (except root)
/// 3. Remove the fragment
/// 4. Remove tracking query parameters (`utm_*` and a fixed list)
/// 5. Sort the remaining query parameters, dropping an empty query
///
/// The scheme and port are kept, so `http://` and `https://` variants of a
/// page are distinct targets.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use newsfusion::url::canonicalize;
///
/// let url = Url::parse("https://WWW.Example.com/news/?page=2&utm_source=x#top").unwrap();
/// assert_eq!(canonicalize(&url), "https://example.com/news?page=2");
/// ```
pub fn canonicalize(url: &Url) -> String {
    let mut out = String::with_capacity(url.as_str().len());

    out.push_str(url.scheme());
    out.push_str("://");

    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();
        out.push_str(host.strip_prefix("www.").unwrap_or(&host));
    }

    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }

    out.push_str(&normalize_path(url.path()));

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !params.is_empty() {
        params.sort();
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        out.push('?');
        out.push_str(&query);
    }

    out
}

/// Collapses empty segments and removes the trailing slash
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
