use url::Url;

/// Unwraps a redirect wrapper that carries the real destination in a query parameter
///
/// Search feeds often link to `https://feed.example/read?url=<destination>`.
/// When the `param` value parses as an absolute http(s) URL it is returned;
/// otherwise the wrapper is returned unchanged. Links whose path contains
/// `/articles/` are feed-internal article pages and are never unwrapped.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use newsfusion::url::unwrap_redirect;
///
/// let wrapper = Url::parse("https://news.example/r?url=https%3A%2F%2Fpaper.example%2Fa").unwrap();
/// assert_eq!(unwrap_redirect(wrapper, "url").as_str(), "https://paper.example/a");
/// ```
pub fn unwrap_redirect(wrapper: Url, param: &str) -> Url {
    if wrapper.path().contains("/articles/") {
        return wrapper;
    }

    let wrapped = wrapper
        .query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| value.into_owned());

    match wrapped.and_then(|value| Url::parse(&value).ok()) {
        Some(target) if matches!(target.scheme(), "http" | "https") => target,
        _ => wrapper,
    }
}
