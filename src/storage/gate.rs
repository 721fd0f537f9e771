//! Dedupe store gate
//!
//! All article writes from crawl workers pass through [`DedupeGate::try_store`].
//! The backend's atomic insert-if-absent decides between created and
//! duplicate; the per-run [`SeenFingerprints`] cache only saves round trips
//! and only remembers fingerprints the gate has already settled.

use crate::extract::ExtractedItem;
use crate::fingerprint::Fingerprint;
use crate::storage::{InsertOutcome, NewArticle, Storage};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Storage backend shared between concurrent workers
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Result of offering an item to the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Created,
    Duplicate,
    Failed(String),
}

/// Who an article belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOwner {
    /// A configured listing source
    Source { id: i64, name: String },
    /// A free-text publisher label (search feeds)
    Label(String),
}

/// Serializes article writes onto the shared backend
#[derive(Clone)]
pub struct DedupeGate {
    storage: SharedStorage,
}

impl DedupeGate {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Stores `item` unless an article with the same fingerprint exists
    ///
    /// Never panics and never returns an error: backend failures are
    /// reported as [`StoreOutcome::Failed`].
    pub fn try_store(&self, item: &ExtractedItem, owner: &ArticleOwner) -> StoreOutcome {
        let (source_id, source_label) = match owner {
            ArticleOwner::Source { id, name } => (Some(*id), name.clone()),
            ArticleOwner::Label(label) => (None, label.clone()),
        };

        let article = NewArticle {
            fingerprint: item.fingerprint,
            title: item.title.clone(),
            summary: item.summary.clone(),
            url: item.url.to_string(),
            source_id,
            source_label,
            published_label: item.published.clone(),
            keyword: item.keyword.clone(),
        };

        let mut storage = match self.storage.lock() {
            Ok(guard) => guard,
            Err(_) => return StoreOutcome::Failed("storage lock poisoned".to_string()),
        };

        match storage.insert_article_if_absent(&article) {
            Ok(InsertOutcome::Inserted(id)) => {
                tracing::debug!("Stored article {} ({})", id, item.fingerprint);
                StoreOutcome::Created
            }
            Ok(InsertOutcome::AlreadyPresent) => StoreOutcome::Duplicate,
            Err(e) => {
                tracing::warn!("Failed to store '{}': {}", item.title, e);
                StoreOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Fingerprints already offered during one run
#[derive(Debug, Default)]
pub struct SeenFingerprints {
    seen: Mutex<HashSet<Fingerprint>>,
}

impl SeenFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the gate already settled this fingerprint during the run
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        match self.seen.lock() {
            Ok(seen) => seen.contains(fingerprint),
            // A poisoned cache only loses the shortcut; the gate still decides
            Err(_) => false,
        }
    }

    /// Remembers a fingerprint the gate stored or found already stored
    pub fn record(&self, fingerprint: &Fingerprint) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.insert(*fingerprint);
        }
    }
}
