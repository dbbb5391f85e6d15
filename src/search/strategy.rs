//! Strategy Selector
//!
//! One strategy per call, chosen by vector availability. Similarity and
//! keyword scores are on different scales and are never fused.

use serde::Serialize;
use std::fmt;

/// Query plan for a single entity kind and tenant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy<'a> {
    /// Rank by distance to the query vector.
    Similarity(&'a [f32]),
    /// Rank by stemmed full-text relevance.
    Keyword(&'a str),
}

impl<'a> Strategy<'a> {
    pub fn mode(&self) -> SearchMode {
        match self {
            Strategy::Similarity(_) => SearchMode::Semantic,
            Strategy::Keyword(_) => SearchMode::FullText,
        }
    }
}

/// Pick similarity when a vector is available, keyword otherwise.
pub fn select<'a>(query: &'a str, vector: Option<&'a [f32]>) -> Strategy<'a> {
    match vector {
        Some(v) if !v.is_empty() => Strategy::Similarity(v),
        _ => Strategy::Keyword(query),
    }
}

/// Caller-facing label for the strategy that ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchMode {
    #[serde(rename = "semantic (vector)")]
    Semantic,
    #[serde(rename = "full-text")]
    FullText,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Semantic => f.write_str("semantic (vector)"),
            SearchMode::FullText => f.write_str("full-text"),
        }
    }
}
