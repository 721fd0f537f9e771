//! Statistics generation from the article database
//!
//! This module provides functionality for extracting and displaying
//! article and run statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::FusionError;

/// Number of runs shown by `--stats`
const RECENT_RUNS: usize = 10;

/// Article statistics summary
#[derive(Debug, Clone)]
pub struct ArticleStatistics {
    /// Total number of stored articles
    pub total_articles: u64,

    /// Articles per source label, largest first
    pub by_label: Vec<(String, u64)>,

    /// Number of configured sources, active or not
    pub total_sources: usize,

    /// Most recent runs first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(ArticleStatistics)` - Successfully loaded statistics
/// * `Err(FusionError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<ArticleStatistics, FusionError> {
    Ok(ArticleStatistics {
        total_articles: storage.count_articles()?,
        by_label: storage.count_articles_by_label()?,
        total_sources: storage.list_sources()?.len(),
        recent_runs: storage.recent_runs(RECENT_RUNS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ArticleStatistics) {
    println!("=== NewsFusion Statistics ===\n");

    println!("Overview:");
    println!("  Total articles: {}", stats.total_articles);
    println!("  Configured sources: {}", stats.total_sources);
    println!();

    if !stats.by_label.is_empty() {
        println!("Articles by Source:");
        for (label, count) in &stats.by_label {
            let percentage = if stats.total_articles > 0 {
                (*count as f64 / stats.total_articles as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", label, count, percentage);
        }
        println!();
    }

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            let scope = match (&run.keyword, run.source_id) {
                (Some(keyword), _) => format!("keyword '{}'", keyword),
                (None, Some(id)) => format!("source {}", id),
                (None, None) => "all".to_string(),
            };
            println!(
                "  #{} {} [{}, {}] {}: discovered {}, stored {}, duplicates {}, errors {}",
                run.id,
                run.started_at,
                run.mode,
                scope,
                run.status,
                run.counts.discovered,
                run.counts.stored,
                run.counts.duplicates,
                run.counts.errors
            );
            if let Some(failure) = &run.failure {
                println!("      {}", failure);
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::state::{RunCounts, RunStatus};
    use crate::storage::{NewArticle, NewRun, SqliteStorage};

    fn article(title: &str, label: &str) -> NewArticle {
        NewArticle {
            fingerprint: fingerprint(&[title]),
            title: title.to_string(),
            summary: title.to_string(),
            url: "https://example.com/a".to_string(),
            source_id: None,
            source_label: label.to_string(),
            published_label: None,
            keyword: None,
        }
    }

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_source("The Hindu", "https://www.thehindu.com/news/", true).unwrap();
        storage.insert_article_if_absent(&article("a", "Reuters")).unwrap();
        storage.insert_article_if_absent(&article("b", "Reuters")).unwrap();
        storage.insert_article_if_absent(&article("c", "Mint")).unwrap();

        let run_id = storage
            .create_run(&NewRun {
                config_hash: "abc".to_string(),
                mode: "sources".to_string(),
                keyword: None,
                source_id: None,
            })
            .unwrap();
        let counts = RunCounts {
            discovered: 3,
            stored: 3,
            ..RunCounts::default()
        };
        storage
            .finish_run(run_id, RunStatus::Completed, &counts, None)
            .unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.total_sources, 1);
        assert_eq!(stats.by_label[0], ("Reuters".to_string(), 2));
        assert_eq!(stats.recent_runs.len(), 1);
        assert_eq!(stats.recent_runs[0].counts.stored, 3);
    }
}
