//! Keyword search over stored articles
//!
//! Some stored summaries end with boilerplate that mentions the keyword
//! without the article being about it ("... related to elections."). Search
//! prefers articles that mention the keyword outside those phrases, but falls
//! back to every match when too few natural mentions remain.

use crate::storage::{ArticleRecord, Storage};
use crate::FusionError;

/// Minimum natural matches before the appended-phrase filter is applied
pub const MIN_NATURAL_MATCHES: usize = 3;

/// Phrase templates whose keyword mention does not count; `{}` is the keyword
const APPENDED_PHRASES: &[&str] = &[
    "related to {}",
    "discusses {} in detail",
    "has significant implications for {}",
    "experts in {} have analyzed",
];

/// Finds stored articles mentioning `keyword`, newest first
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `keyword` - Matched case-insensitively against title and summary
/// * `limit` - Maximum number of articles returned
pub fn search_articles(
    storage: &dyn Storage,
    keyword: &str,
    limit: usize,
) -> Result<Vec<ArticleRecord>, FusionError> {
    let keyword = keyword.trim();
    if keyword.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    // The filter and fallback look at every match; `limit` applies last
    let matches = storage.find_articles_containing(keyword, None)?;
    let natural: Vec<ArticleRecord> = matches
        .iter()
        .filter(|article| mentions_naturally(article, keyword))
        .cloned()
        .collect();

    let mut results = if natural.len() >= MIN_NATURAL_MATCHES {
        natural
    } else {
        tracing::debug!(
            "Only {} natural matches for '{}', returning all {}",
            natural.len(),
            keyword,
            matches.len()
        );
        matches
    };
    results.truncate(limit);
    Ok(results)
}

/// True if the keyword occurs in the article outside every appended phrase
fn mentions_naturally(article: &ArticleRecord, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    [&article.title, &article.summary]
        .iter()
        .any(|text| has_natural_mention(&text.to_lowercase(), &keyword))
}

fn has_natural_mention(text: &str, keyword: &str) -> bool {
    let mut stripped = text.to_string();
    for template in APPENDED_PHRASES {
        stripped = stripped.replace(&template.replace("{}", keyword), " ");
    }
    stripped.contains(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::storage::{NewArticle, SqliteStorage};

    fn store(storage: &mut SqliteStorage, title: &str, summary: &str) {
        storage
            .insert_article_if_absent(&NewArticle {
                fingerprint: fingerprint(&[title, summary]),
                title: title.to_string(),
                summary: summary.to_string(),
                url: "https://example.com/a".to_string(),
                source_id: None,
                source_label: "Feed".to_string(),
                published_label: None,
                keyword: None,
            })
            .unwrap();
    }

    #[test]
    fn test_natural_mention_detection() {
        assert!(has_natural_mention("inflation eases in march", "inflation"));
        assert!(!has_natural_mention(
            "markets close higher. this story is related to inflation.",
            "inflation"
        ));
        assert!(has_natural_mention(
            "inflation worries persist. related to inflation.",
            "inflation"
        ));
    }

    #[test]
    fn test_appended_mentions_filtered_when_enough_natural() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        store(&mut storage, "Inflation eases", "CPI falls to 4%");
        store(&mut storage, "RBI on inflation", "Policy unchanged");
        store(&mut storage, "Food inflation spikes", "Vegetable prices up");
        store(&mut storage, "Cricket final", "Experts in inflation have analyzed the match");

        let results = search_articles(&storage, "INFLATION", 10).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|a| a.title != "Cricket final"));
    }

    #[test]
    fn test_falls_back_to_all_matches() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        store(&mut storage, "Inflation eases", "CPI falls to 4%");
        store(&mut storage, "Cricket final", "This discusses inflation in detail");

        let results = search_articles(&storage, "inflation", 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_limit_applies_after_filtering() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        store(&mut storage, "Inflation eases", "CPI falls to 4%");
        store(&mut storage, "RBI on inflation", "Policy unchanged");
        store(&mut storage, "Food inflation spikes", "Vegetable prices up");
        // Newest rows only mention the keyword in appended phrases
        store(&mut storage, "Cricket final", "This story is related to inflation.");
        store(&mut storage, "Hockey semi", "This story is related to inflation.");

        let results = search_articles(&storage, "inflation", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|a| a.title != "Cricket final" && a.title != "Hockey semi"));
    }

    #[test]
    fn test_empty_keyword() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(search_articles(&storage, "  ", 10).unwrap().is_empty());
    }
}
