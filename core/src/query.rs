//! Term-at-a-time cosine ranking over a loaded [`Index`].
//!
//! Every stored weight is already normalized per document, so summing a
//! document's weights over the query terms is the dot product of the
//! document vector with the unit-weighted query.

use crate::error::Result;
use crate::index::Index;
use crate::persist::{load_index, IndexPaths};
use crate::DocIdx;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub top_k: usize,
}

impl Default for SearchOptions {
    fn default() -> Self { Self { top_k: DEFAULT_TOP_K } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TermStatus {
    Found { doc_count: u32 },
    NotIndexed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermReport {
    pub term: String,
    #[serde(flatten)]
    pub status: TermStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub doc_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    /// Top-K hits, best first.
    pub hits: Vec<Hit>,
    /// Distinct documents that matched at least one query term.
    pub total_matches: usize,
    /// One entry per query term, in query order.
    pub terms: Vec<TermReport>,
}

impl SearchResults {
    pub fn missing_terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms
            .iter()
            .filter(|t| t.status == TermStatus::NotIndexed)
            .map(|t| t.term.as_str())
    }
}

/// Shared, immutable query engine. Cheap to put behind an `Arc`.
#[derive(Debug)]
pub struct QueryEngine {
    index: Index,
}

impl QueryEngine {
    pub fn new(index: Index) -> Self { Self { index } }

    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::new(load_index(&IndexPaths::new(dir))?))
    }

    pub fn index(&self) -> &Index { &self.index }

    /// Split free text on whitespace and lowercase each word.
    pub fn parse_query(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    /// Rank documents for `terms`. Repeated terms contribute once per occurrence.
    pub fn search<S: AsRef<str>>(&self, terms: &[S], opts: &SearchOptions) -> SearchResults {
        let mut scores: HashMap<DocIdx, f64> = HashMap::new();
        let mut reports = Vec::with_capacity(terms.len());

        for raw in terms {
            let term = raw.as_ref().to_lowercase();
            let status = match self.index.lookup(&term) {
                Some(entry) => {
                    for p in self.index.postings(entry) {
                        *scores.entry(p.doc).or_insert(0.0) += p.weight;
                    }
                    TermStatus::Found { doc_count: entry.doc_count }
                }
                None => TermStatus::NotIndexed,
            };
            tracing::debug!(term = %term, ?status, "term lookup");
            reports.push(TermReport { term, status });
        }

        let total_matches = scores.len();
        let hits = self.rank(scores, opts.top_k);
        SearchResults { hits, total_matches, terms: reports }
    }

    /// Convenience wrapper over [`Self::parse_query`] and [`Self::search`].
    pub fn search_text(&self, text: &str, opts: &SearchOptions) -> SearchResults {
        self.search(&Self::parse_query(text), opts)
    }

    fn rank(&self, scores: HashMap<DocIdx, f64>, k: usize) -> Vec<Hit> {
        let mut scored: Vec<(DocIdx, f64)> = scores.into_iter().collect();
        let order = |a: &(DocIdx, f64), b: &(DocIdx, f64)| -> Ordering {
            b.1.total_cmp(&a.1)
                .then_with(|| self.index.doc_id(a.0).cmp(self.index.doc_id(b.0)))
        };
        if k == 0 {
            return Vec::new();
        }
        if scored.len() > k {
            scored.select_nth_unstable_by(k - 1, order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(order);
        scored
            .into_iter()
            .map(|(doc, score)| Hit { doc_id: self.index.doc_id(doc).to_string(), score })
            .collect()
    }
}
