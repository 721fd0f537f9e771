//! Pagination traversal
//!
//! A [`Paginator`] follows "next page" links for one target. It stops when a
//! page has no next link, when the page cap is reached, or when the next link
//! leads to a page already visited in this traversal. Visited pages are
//! compared by canonical URL, so `?a=1&b=2` and `?b=2&a=1` are the same page.

use crate::url::canonicalize;
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Why a traversal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoNextPage,
    DepthLimit,
    Cycle,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNextPage => write!(f, "no next page"),
            Self::DepthLimit => write!(f, "page limit reached"),
            Self::Cycle => write!(f, "next page already visited"),
        }
    }
}

/// Traversal state for one target
#[derive(Debug)]
pub struct Paginator {
    max_pages: u32,
    pages: u32,
    visited: HashSet<String>,
}

impl Paginator {
    /// Starts a traversal at `start`, which counts as the first page
    pub fn new(start: &Url, max_pages: u32) -> Self {
        let mut visited = HashSet::new();
        visited.insert(canonicalize(start));
        Self {
            max_pages: max_pages.max(1),
            pages: 1,
            visited,
        }
    }

    /// Number of pages handed out so far, the start page included
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Records the URL a fetch actually landed on after redirects
    pub fn mark_visited(&mut self, url: &Url) {
        self.visited.insert(canonicalize(url));
    }

    /// Decides whether to follow `next`
    ///
    /// Returns the page to fetch, or the reason the traversal is over.
    pub fn advance(&mut self, next: Option<Url>) -> Result<Url, StopReason> {
        let next = next.ok_or(StopReason::NoNextPage)?;

        if self.pages >= self.max_pages {
            return Err(StopReason::DepthLimit);
        }
        if !self.visited.insert(canonicalize(&next)) {
            return Err(StopReason::Cycle);
        }

        self.pages += 1;
        Ok(next)
    }
}
