use crate::stats::CorpusStats;
use crate::DocIdx;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdfMode {
    /// ln(N / df). A term present in every document weighs 0.
    #[default]
    Standard,
    /// ln(1 + N / df). Never 0, so corpus-wide terms still rank.
    Smoothed,
}

impl IdfMode {
    pub fn idf(self, num_docs: usize, df: u32) -> f64 {
        let ratio = num_docs as f64 / f64::from(df.max(1));
        match self {
            IdfMode::Standard => ratio.ln(),
            IdfMode::Smoothed => (1.0 + ratio).ln(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeightedTerm {
    pub term: String,
    /// (document, normalized weight), in document processing order.
    pub postings: Vec<(DocIdx, f64)>,
}

/// Normalized tf-idf weights for every (term, document) pair that survived pruning.
#[derive(Debug, Clone, Default)]
pub struct WeightedCorpus {
    pub doc_ids: Vec<String>,
    pub terms: Vec<WeightedTerm>,
}

impl WeightedCorpus {
    pub fn num_docs(&self) -> usize { self.doc_ids.len() }

    pub fn num_postings(&self) -> usize { self.terms.iter().map(|t| t.postings.len()).sum() }

    /// Per-document vectors, terms in dictionary order.
    pub fn document_vectors(&self) -> Vec<Vec<(&str, f64)>> {
        let mut vectors: Vec<Vec<(&str, f64)>> = vec![Vec::new(); self.doc_ids.len()];
        for t in &self.terms {
            for &(doc, w) in &t.postings {
                vectors[doc as usize].push((t.term.as_str(), w));
            }
        }
        vectors
    }
}

/// Weigh every pair as (count / doc length) * idf, then scale each document to unit length.
pub fn weigh(stats: &CorpusStats, mode: IdfMode) -> WeightedCorpus {
    let n = stats.num_docs();
    let docs = stats.docs();
    let mut doc_norms: Vec<f64> = vec![0.0; n];

    // First pass: raw tf-idf and squared norms
    let mut terms: Vec<WeightedTerm> = Vec::with_capacity(stats.num_terms());
    for t in stats.terms() {
        let idf = mode.idf(n, t.df);
        let mut postings = Vec::with_capacity(t.postings.len());
        for &(doc, count) in t.postings {
            let len = docs[doc as usize].length.max(1);
            let tfidf = f64::from(count) / f64::from(len) * idf;
            doc_norms[doc as usize] += tfidf * tfidf;
            postings.push((doc, tfidf));
        }
        terms.push(WeightedTerm { term: t.term.to_string(), postings });
    }
    for dn in doc_norms.iter_mut() {
        *dn = dn.sqrt();
    }

    // Second pass: normalize. A zero norm means every weight is already 0.
    for t in terms.iter_mut() {
        for (doc, w) in t.postings.iter_mut() {
            let norm = doc_norms[*doc as usize];
            if norm > 0.0 {
                *w /= norm;
            }
        }
    }

    WeightedCorpus { doc_ids: docs.iter().map(|d| d.doc_id.clone()).collect(), terms }
}
