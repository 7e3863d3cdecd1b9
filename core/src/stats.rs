//! Term and document frequency accumulation.
//!
//! [`CorpusBuilder`] is the mutable accumulator. Workers each fill their own
//! builder over a contiguous run of documents and the partials are combined
//! with [`CorpusBuilder::merge`]. Pruning happens once, in
//! [`CorpusBuilder::finish`], after every partial has been merged.

use crate::{DocIdx, TermId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStats {
    pub doc_id: String,
    /// Term occurrences after stopword filtering, before pruning.
    pub length: u32,
}

/// (document, raw count) pairs for one term, in document processing order.
pub type RawPostings = Vec<(DocIdx, u32)>;

#[derive(Debug, Default)]
pub struct CorpusBuilder {
    dictionary: HashMap<String, TermId>,
    terms: Vec<String>,
    df: Vec<u32>,
    postings: Vec<RawPostings>,
    docs: Vec<DocumentStats>,
}

impl CorpusBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    fn intern(&mut self, term: &str) -> TermId {
        if let Some(&tid) = self.dictionary.get(term) {
            return tid;
        }
        let tid = self.terms.len() as TermId;
        self.dictionary.insert(term.to_string(), tid);
        self.terms.push(term.to_string());
        self.df.push(0);
        self.postings.push(Vec::new());
        tid
    }

    /// Fold one tokenized document in. Term ids are handed out in first-seen order.
    pub fn add_document<S: AsRef<str>>(&mut self, doc_id: impl Into<String>, tokens: &[S]) -> DocIdx {
        let doc = self.docs.len() as DocIdx;
        let mut order: Vec<TermId> = Vec::new();
        let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
        for token in tokens {
            let tid = self.intern(token.as_ref());
            let count = tf_counts.entry(tid).or_insert(0);
            if *count == 0 {
                order.push(tid);
            }
            *count += 1;
        }
        // one df increment per distinct term, not per occurrence
        for tid in order {
            self.df[tid as usize] += 1;
            self.postings[tid as usize].push((doc, tf_counts[&tid]));
        }
        self.docs.push(DocumentStats { doc_id: doc_id.into(), length: tokens.len() as u32 });
        doc
    }

    /// Append `other`, whose documents come after ours in processing order.
    ///
    /// Merging contiguous partials left to right yields exactly the builder a
    /// single sequential pass would have produced.
    pub fn merge(&mut self, other: CorpusBuilder) {
        let offset = self.docs.len() as DocIdx;
        let CorpusBuilder { terms, df, postings, docs, .. } = other;
        for ((term, df_t), plist) in terms.into_iter().zip(df).zip(postings) {
            let tid = self.intern(&term) as usize;
            self.df[tid] += df_t;
            self.postings[tid].extend(plist.into_iter().map(|(d, c)| (d + offset, c)));
        }
        self.docs.extend(docs);
    }

    /// Drop every term seen in exactly one document and freeze the result.
    pub fn finish(self) -> CorpusStats {
        let CorpusBuilder { terms, df, postings, docs, .. } = self;
        let mut stats = CorpusStats { docs, ..Default::default() };
        let mut pruned = 0usize;
        for ((term, df_t), plist) in terms.into_iter().zip(df).zip(postings) {
            if df_t < 2 {
                pruned += 1;
                continue;
            }
            stats.dictionary.insert(term.clone(), stats.terms.len() as TermId);
            stats.terms.push(term);
            stats.df.push(df_t);
            stats.postings.push(plist);
        }
        tracing::debug!(pruned, kept = stats.terms.len(), "pruned single-document terms");
        stats
    }
}

/// Frozen corpus statistics. Every term here has df >= 2.
#[derive(Debug, Default)]
pub struct CorpusStats {
    dictionary: HashMap<String, TermId>,
    terms: Vec<String>,
    df: Vec<u32>,
    postings: Vec<RawPostings>,
    docs: Vec<DocumentStats>,
}

#[derive(Debug, Clone, Copy)]
pub struct TermStats<'a> {
    pub term: &'a str,
    pub df: u32,
    pub postings: &'a [(DocIdx, u32)],
}

impl CorpusStats {
    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn docs(&self) -> &[DocumentStats] { &self.docs }

    /// Terms in first-seen order.
    pub fn terms(&self) -> impl Iterator<Item = TermStats<'_>> + '_ {
        self.terms.iter().enumerate().map(move |(i, term)| TermStats {
            term,
            df: self.df[i],
            postings: &self.postings[i],
        })
    }

    pub fn term(&self, term: &str) -> Option<TermStats<'_>> {
        let tid = *self.dictionary.get(term)? as usize;
        Some(TermStats { term: &self.terms[tid], df: self.df[tid], postings: &self.postings[tid] })
    }

    pub fn df(&self, term: &str) -> Option<u32> { self.term(term).map(|t| t.df) }

    /// Raw count of `term` in the document named `doc_id`.
    pub fn tf(&self, term: &str, doc_id: &str) -> Option<u32> {
        self.term(term)?
            .postings
            .iter()
            .find(|(d, _)| self.docs[*d as usize].doc_id == doc_id)
            .map(|(_, c)| *c)
    }
}
