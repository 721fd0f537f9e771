//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::fingerprint::Fingerprint;
use crate::state::{RunCounts, RunStatus};
use crate::storage::{ArticleRecord, NewArticle, NewRun, RunRecord, Source};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Source not found: {0}")]
    SourceNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result of an atomic insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created with this id
    Inserted(i64),
    /// A row with the same fingerprint already existed
    AlreadyPresent,
}

/// Trait for storage backend implementations
///
/// Every mutation of the articles table goes through
/// [`Storage::insert_article_if_absent`], which must be atomic with respect
/// to other connections on the same database.
pub trait Storage {
    // ===== Sources =====

    /// Inserts a source or updates the name and activity flag of an existing one
    ///
    /// # Returns
    ///
    /// The source id
    fn upsert_source(&mut self, name: &str, url: &str, active: bool) -> StorageResult<i64>;

    /// Lists active sources, optionally narrowed to one id
    fn list_active_sources(&self, source_id: Option<i64>) -> StorageResult<Vec<Source>>;

    /// Lists every source, active or not
    fn list_sources(&self) -> StorageResult<Vec<Source>>;

    // ===== Articles =====

    /// Inserts the article unless its fingerprint is already stored
    fn insert_article_if_absent(&mut self, article: &NewArticle) -> StorageResult<InsertOutcome>;

    fn get_article_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StorageResult<Option<ArticleRecord>>;

    fn count_articles(&self) -> StorageResult<u64>;

    /// Article counts per source label, largest first
    fn count_articles_by_label(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Articles whose title or summary contains `keyword` (ASCII case-insensitive),
    /// newest first, at most `limit` of them when given
    fn find_articles_containing(
        &self,
        keyword: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<ArticleRecord>>;

    // ===== Runs =====

    /// Records the start of a run
    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64>;

    /// Records a run's terminal status and counts
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
        failure: Option<&str>,
    ) -> StorageResult<()>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;
}
