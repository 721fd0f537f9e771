//! URL handling module for NewsFusion
//!
//! This module provides:
//! - Domain keys used to group requests for per-domain throttling
//! - Wildcard matching of hosts against layout domain patterns
//! - Canonical forms used by pagination cycle guards
//! - Unwrapping of redirect wrappers that carry the real article URL
//! - Resolution of relative hrefs against a document's base URL

mod domain;
mod matcher;
mod normalize;
mod redirect;

use url::Url;

// Re-export main functions
pub use domain::{domain_key, extract_domain};
pub use matcher::matches_wildcard;
pub use normalize::canonicalize;
pub use redirect::unwrap_redirect;

/// Resolves an href found in a document to an absolute HTTP(S) URL
///
/// Returns None if the href should be ignored:
/// - empty or fragment-only (same page anchors)
/// - javascript:, mailto:, tel:, data: schemes
/// - anything that does not resolve to http or https
///
/// # Arguments
///
/// * `base` - URL of the document the href was found in
/// * `href` - Raw attribute value
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}
