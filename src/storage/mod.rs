//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Source listing for the crawl coordinator
//! - Atomic insert-if-absent of articles keyed by fingerprint
//! - Run bookkeeping
//!
//! The [`DedupeGate`] wraps a shared backend and is the only path by which
//! crawl workers write articles.

mod gate;
mod schema;
mod sqlite;
mod traits;

pub use gate::{ArticleOwner, DedupeGate, SeenFingerprints, SharedStorage, StoreOutcome};
pub use sqlite::SqliteStorage;
pub use traits::{InsertOutcome, Storage, StorageError, StorageResult};

use crate::fingerprint::Fingerprint;
use crate::state::{RunCounts, RunStatus};
use crate::FusionError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, FusionError> {
    SqliteStorage::new(path)
}

/// Represents a news source in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub active: bool,
    pub created_at: String,
}

/// An article about to be stored
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub fingerprint: Fingerprint,
    pub title: String,
    pub summary: String,
    pub url: String,
    /// Owning source for listing articles, None for search-feed articles
    pub source_id: Option<i64>,
    pub source_label: String,
    pub published_label: Option<String>,
    pub keyword: Option<String>,
}

/// Represents a stored article
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub fingerprint: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source_id: Option<i64>,
    pub source_label: String,
    pub published_label: Option<String>,
    pub keyword: Option<String>,
    pub created_at: String,
}

/// Parameters recorded when a run starts
#[derive(Debug, Clone)]
pub struct NewRun {
    pub config_hash: String,
    /// "sources" or "search-feed"
    pub mode: String,
    pub keyword: Option<String>,
    pub source_id: Option<i64>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub mode: String,
    pub keyword: Option<String>,
    pub source_id: Option<i64>,
    pub status: RunStatus,
    pub counts: RunCounts,
    pub failure: Option<String>,
}
