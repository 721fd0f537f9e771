//! Field extraction
//!
//! Extraction is a pure transform over a parsed document: each field is
//! described by an ordered list of typed strategies, the first non-empty match
//! wins, and a missing field is reported as [`Extracted::Absent`] rather than
//! an error.
//!
//! `scraper::Html` is not `Send`, so callers parse and extract synchronously
//! and only carry the owned results across await points.

mod layout;
mod strategy;

pub use layout::{ItemFields, ItemOutcome, Layout, LayoutDef, LayoutRegistry, SourceFamily};
pub use strategy::{Extracted, FieldSpec, Strategy, StrategyDef};

use crate::fingerprint::{Fingerprint, FingerprintScheme};
use scraper::Html;
use url::Url;

/// A valid item ready for deduplication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedItem {
    pub title: String,
    pub summary: String,
    pub url: Url,
    pub publisher: Option<String>,
    pub published: Option<String>,
    pub keyword: Option<String>,
    pub fingerprint: Fingerprint,
}

impl ExtractedItem {
    /// Attaches the originating keyword and computes the fingerprint under `scheme`
    pub fn new(fields: ItemFields, keyword: Option<&str>, scheme: FingerprintScheme) -> Self {
        let fingerprint = scheme.apply(&fields.title, &fields.summary, fields.url.as_str());
        Self {
            title: fields.title,
            summary: fields.summary,
            url: fields.url,
            publisher: fields.publisher,
            published: fields.published,
            keyword: keyword.map(str::to_string),
            fingerprint,
        }
    }

    /// Case-insensitive keyword match against the headline or summary
    pub fn mentions(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.summary.to_lowercase().contains(&needle)
    }
}

/// Everything read from one fetched page
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    pub items: Vec<ItemOutcome>,
    pub next_page: Option<Url>,
}

/// Parses `body` and applies `layout` to it
pub fn extract_page(layout: &Layout, body: &str, base: &Url) -> PageExtract {
    let document = Html::parse_document(body);
    PageExtract {
        items: layout.extract_items(&document, base),
        next_page: layout.next_page(&document, base),
    }
}
