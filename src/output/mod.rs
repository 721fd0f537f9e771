//! Output module for reporting crawl results
//!
//! This module handles:
//! - Printing a run's terminal report
//! - Printing article and run statistics
//! - Printing keyword search results

pub mod stats;

pub use stats::{load_statistics, print_statistics, ArticleStatistics};

use crate::crawler::RunReport;
use crate::storage::ArticleRecord;

/// Prints a run's status and counts to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Run {} ===\n", report.run_id);
    println!("  Status: {}", report.status);
    if let Some(keyword) = &report.keyword {
        println!("  Keyword: {}", keyword);
    }
    if let Some(source_id) = report.source_id {
        println!("  Source: {}", source_id);
    }
    println!("  Discovered: {}", report.counts.discovered);
    println!("  Stored: {}", report.counts.stored);
    println!("  Duplicates: {}", report.counts.duplicates);
    println!("  Errors: {}", report.counts.errors);
    println!("  Dropped (incomplete): {}", report.counts.dropped);
    if let Some(failure) = &report.failure {
        println!("  Failure: {}", failure);
    }
}

/// Prints stored articles one per block
pub fn print_articles(articles: &[ArticleRecord]) {
    if articles.is_empty() {
        println!("No matching articles.");
        return;
    }

    for article in articles {
        println!("{}", article.title);
        println!("  {} | {}", article.source_label, article.published_label.as_deref().unwrap_or("-"));
        println!("  {}", article.url);
        if article.summary != article.title {
            println!("  {}", article.summary);
        }
        println!();
    }
}
