//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::fingerprint::Fingerprint;
use crate::state::{RunCounts, RunStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{InsertOutcome, Storage, StorageError, StorageResult};
use crate::storage::{ArticleRecord, NewArticle, NewRun, RunRecord, Source};
use crate::FusionError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// How long a connection waits on another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ARTICLE_COLUMNS: &str = "id, fingerprint, title, summary, url, source_id, source_label,
     published_label, keyword, created_at";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, mode, keyword, source_id,
     status, discovered, stored, duplicates, errors, dropped, failure";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Several instances may open the same file; article inserts stay atomic
    /// across them.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> Result<Self, FusionError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Configure SQLite for concurrent readers and a single writer
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, FusionError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleRecord> {
    Ok(ArticleRecord {
        id: row.get(0)?,
        fingerprint: row.get(1)?,
        title: row.get(2)?,
        summary: row.get(3)?,
        url: row.get(4)?,
        source_id: row.get(5)?,
        source_label: row.get(6)?,
        published_label: row.get(7)?,
        keyword: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        mode: row.get(4)?,
        keyword: row.get(5)?,
        source_id: row.get(6)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(7)?)
            .unwrap_or(RunStatus::Failed),
        counts: RunCounts {
            discovered: row.get::<_, i64>(8)? as u64,
            stored: row.get::<_, i64>(9)? as u64,
            duplicates: row.get::<_, i64>(10)? as u64,
            errors: row.get::<_, i64>(11)? as u64,
            dropped: row.get::<_, i64>(12)? as u64,
        },
        failure: row.get(13)?,
    })
}

/// Escapes LIKE wildcards so the keyword matches literally
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Storage for SqliteStorage {
    // ===== Sources =====

    fn upsert_source(&mut self, name: &str, url: &str, active: bool) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sources (name, url, is_active, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO UPDATE SET name = excluded.name, is_active = excluded.is_active",
            params![name, url, active, now],
        )?;

        let id = self
            .conn
            .query_row("SELECT id FROM sources WHERE url = ?1", params![url], |row| {
                row.get(0)
            })?;
        Ok(id)
    }

    fn list_active_sources(&self, source_id: Option<i64>) -> StorageResult<Vec<Source>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, url, is_active, created_at FROM sources
             WHERE is_active = 1 AND (?1 IS NULL OR id = ?1) ORDER BY id",
        )?;

        let sources = stmt
            .query_map(params![source_id], source_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    fn list_sources(&self) -> StorageResult<Vec<Source>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, url, is_active, created_at FROM sources ORDER BY id")?;

        let sources = stmt
            .query_map([], source_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    // ===== Articles =====

    fn insert_article_if_absent(&mut self, article: &NewArticle) -> StorageResult<InsertOutcome> {
        let now = Utc::now().to_rfc3339();

        // IMMEDIATE takes the write lock up front, so the conflict check and
        // the insert see the same database state on every connection
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "INSERT INTO articles (fingerprint, title, summary, url, source_id, source_label,
             published_label, keyword, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(fingerprint) DO NOTHING",
            params![
                article.fingerprint.to_hex(),
                article.title,
                article.summary,
                article.url,
                article.source_id,
                article.source_label,
                article.published_label,
                article.keyword,
                now
            ],
        )?;

        let outcome = if changed == 1 {
            InsertOutcome::Inserted(tx.last_insert_rowid())
        } else {
            InsertOutcome::AlreadyPresent
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn get_article_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StorageResult<Option<ArticleRecord>> {
        let article = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM articles WHERE fingerprint = ?1",
                    ARTICLE_COLUMNS
                ),
                params![fingerprint.to_hex()],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_articles_by_label(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_label, COUNT(*) AS n FROM articles
             GROUP BY source_label ORDER BY n DESC, source_label",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn find_articles_containing(
        &self,
        keyword: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<ArticleRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM articles
             WHERE title LIKE ?1 ESCAPE '\\' OR summary LIKE ?1 ESCAPE '\\'
             ORDER BY created_at DESC, id DESC LIMIT ?2",
            ARTICLE_COLUMNS
        ))?;

        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let articles = stmt
            .query_map(
                params![like_pattern(keyword), limit],
                article_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    // ===== Runs =====

    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, mode, keyword, source_id, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                run.config_hash,
                run.mode,
                run.keyword,
                run.source_id,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
        failure: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, discovered = ?3, stored = ?4,
             duplicates = ?5, errors = ?6, dropped = ?7, failure = ?8 WHERE id = ?9",
            params![
                status.to_db_string(),
                now,
                counts.discovered as i64,
                counts.stored as i64,
                counts.duplicates as i64,
                counts.errors as i64,
                counts.dropped as i64,
                failure,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
