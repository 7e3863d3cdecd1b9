use crate::weighting::WeightedCorpus;
use crate::DocIdx;
use std::collections::HashMap;

/// Where one term's postings live in the postings array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry {
    pub doc_count: u32,
    pub offset: usize,
}

impl DictEntry {
    pub fn range(&self) -> std::ops::Range<usize> { self.offset..self.offset + self.doc_count as usize }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub doc: DocIdx,
    pub weight: f64, // normalized tf-idf weight
}

/// Read-only dictionary + postings pair.
///
/// Postings form one contiguous array; each dictionary entry addresses a
/// `(offset, doc_count)` slice of it. Document names are interned so
/// postings stay small.
#[derive(Debug, Default)]
pub struct Index {
    dictionary: HashMap<String, DictEntry>,
    terms: Vec<String>,
    postings: Vec<Posting>,
    doc_ids: Vec<String>,
}

impl Index {
    /// Lay out a weighted corpus exactly as the serializer writes it.
    pub fn from_weighted(corpus: &WeightedCorpus) -> Self {
        let mut index = Index { doc_ids: corpus.doc_ids.clone(), ..Default::default() };
        for t in &corpus.terms {
            let entry = DictEntry { doc_count: t.postings.len() as u32, offset: index.postings.len() };
            index
                .postings
                .extend(t.postings.iter().map(|&(doc, weight)| Posting { doc, weight }));
            index.dictionary.insert(t.term.clone(), entry);
            index.terms.push(t.term.clone());
        }
        index
    }

    /// Assemble from already-validated parts. `entries` must tile `postings`.
    pub(crate) fn from_parts(entries: Vec<(String, DictEntry)>, postings: Vec<Posting>, doc_ids: Vec<String>) -> Self {
        let mut dictionary = HashMap::with_capacity(entries.len());
        let mut terms = Vec::with_capacity(entries.len());
        for (term, entry) in entries {
            dictionary.insert(term.clone(), entry);
            terms.push(term);
        }
        Index { dictionary, terms, postings, doc_ids }
    }

    pub fn lookup(&self, term: &str) -> Option<DictEntry> { self.dictionary.get(term).copied() }

    pub fn postings(&self, entry: DictEntry) -> &[Posting] { &self.postings[entry.range()] }

    pub fn all_postings(&self) -> &[Posting] { &self.postings }

    pub fn doc_id(&self, doc: DocIdx) -> &str { &self.doc_ids[doc as usize] }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn num_postings(&self) -> usize { self.postings.len() }

    /// Documents known to the index. Built in memory this includes documents
    /// with no postings; loaded from disk only those that appear in postings.
    pub fn num_docs(&self) -> usize { self.doc_ids.len() }

    /// Dictionary entries in stored order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, DictEntry)> + '_ {
        self.terms.iter().map(move |t| (t.as_str(), self.dictionary[t]))
    }
}
