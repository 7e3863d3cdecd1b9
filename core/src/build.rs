//! Batch pipeline: corpus directory → stats → weights → index files.

use crate::corpus::{list_documents, read_document, HtmlText, SourceDoc, TextExtractor};
use crate::error::{Error, Result};
use crate::persist::{write_index, IndexPaths, MetaFile};
use crate::stats::{CorpusBuilder, CorpusStats};
use crate::tokenizer::{Stopwords, Tokenizer};
use crate::weighting::{weigh, IdfMode, WeightedCorpus};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

const PROGRESS_EVERY: usize = 100;

#[derive(Clone)]
pub struct BuildOptions {
    pub stopwords: Stopwords,
    pub idf: IdfMode,
    pub extractor: Arc<dyn TextExtractor>,
    /// Worker threads for document processing. `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { stopwords: Stopwords::empty(), idf: IdfMode::default(), extractor: Arc::new(HtmlText), threads: None }
    }
}

impl std::fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOptions")
            .field("stopwords", &self.stopwords.len())
            .field("idf", &self.idf)
            .field("threads", &self.threads)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub num_docs: usize,
    pub skipped: usize,
    pub empty: usize,
    pub num_terms: usize,
    pub num_postings: usize,
    pub elapsed_ms: u128,
}

struct Progress {
    done: AtomicUsize,
    total: usize,
}

impl Progress {
    fn new(total: usize) -> Self { Self { done: AtomicUsize::new(0), total } }

    fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_EVERY == 0 {
            tracing::info!(done, total = self.total, "documents processed");
        }
    }
}

fn tokenize_doc(doc: &SourceDoc, tokenizer: &Tokenizer, opts: &BuildOptions) -> Result<Vec<String>> {
    let text = read_document(&doc.path, opts.extractor.as_ref())?;
    let tokens = tokenizer.tokenize(&text);
    if tokens.is_empty() {
        return Err(Error::EmptyDocument { doc_id: doc.doc_id.clone() });
    }
    Ok(tokens)
}

#[derive(Default)]
struct Partial {
    builder: CorpusBuilder,
    skipped: usize,
    empty: usize,
}

impl Partial {
    fn merge(&mut self, other: Partial) {
        self.builder.merge(other.builder);
        self.skipped += other.skipped;
        self.empty += other.empty;
    }
}

fn with_pool<T: Send>(threads: Option<usize>, f: impl FnOnce() -> T + Send) -> Result<T> {
    match threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            Ok(pool.install(f))
        }
        None => Ok(f()),
    }
}

/// Tokenize and count every document. Unreadable documents are skipped;
/// empty ones still count toward N.
pub fn collect_stats(docs: &[SourceDoc], opts: &BuildOptions) -> Result<(CorpusStats, BuildReport)> {
    let tokenizer = Tokenizer::new(opts.stopwords.clone());
    let progress = Progress::new(docs.len());

    let partials: Vec<Partial> = with_pool(opts.threads, || {
        let chunk = docs.len().div_ceil(rayon::current_num_threads() * 4).max(1);
        docs.par_chunks(chunk)
            .map(|chunk| {
                let mut part = Partial::default();
                for doc in chunk {
                    match tokenize_doc(doc, &tokenizer, opts) {
                        Ok(tokens) => {
                            part.builder.add_document(doc.doc_id.as_str(), &tokens);
                        }
                        Err(err @ Error::EmptyDocument { .. }) => {
                            tracing::debug!(error = %err, "empty document");
                            part.builder.add_document(doc.doc_id.as_str(), &Vec::<String>::new());
                            part.empty += 1;
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "skipping document");
                            part.skipped += 1;
                        }
                    }
                    progress.tick();
                }
                part
            })
            .collect()
    })?;

    // join point: merge in document order, prune only afterwards
    let mut all = Partial::default();
    for part in partials {
        all.merge(part);
    }
    let report = BuildReport {
        num_docs: all.builder.num_docs(),
        skipped: all.skipped,
        empty: all.empty,
        ..Default::default()
    };
    Ok((all.builder.finish(), report))
}

/// Stats and weights for every document under `input`.
pub fn weigh_corpus(input: &Path, opts: &BuildOptions) -> Result<(WeightedCorpus, BuildReport)> {
    let docs = list_documents(input)?;
    tracing::info!(input = %input.display(), files = docs.len(), "corpus listed");
    let (stats, mut report) = collect_stats(&docs, opts)?;
    let weighted = weigh(&stats, opts.idf);
    report.num_terms = weighted.terms.len();
    report.num_postings = weighted.num_postings();
    Ok((weighted, report))
}

/// Build the dictionary/postings pair for `input` into `output`.
pub fn build_index(input: &Path, output: &Path, opts: &BuildOptions) -> Result<(BuildReport, MetaFile)> {
    let start = Instant::now();
    let (weighted, mut report) = weigh_corpus(input, opts)?;
    let meta = write_index(&IndexPaths::new(output), &weighted)?;
    report.elapsed_ms = start.elapsed().as_millis();
    tracing::info!(
        num_docs = report.num_docs,
        skipped = report.skipped,
        empty = report.empty,
        terms = report.num_terms,
        elapsed_ms = report.elapsed_ms as u64,
        "index build complete"
    );
    Ok((report, meta))
}

/// Write one `<doc_id>.wts` file per document with its normalized weights.
pub fn write_weight_files(input: &Path, output: &Path, opts: &BuildOptions) -> Result<BuildReport> {
    let start = Instant::now();
    let (weighted, mut report) = weigh_corpus(input, opts)?;
    fs::create_dir_all(output)?;
    for (doc_id, vector) in weighted.doc_ids.iter().zip(weighted.document_vectors()) {
        let mut out = String::new();
        for (term, w) in vector {
            let _ = writeln!(out, "{term} \t {w}");
        }
        fs::write(output.join(format!("{doc_id}.wts")), out)?;
    }
    report.elapsed_ms = start.elapsed().as_millis();
    tracing::info!(docs = report.num_docs, elapsed_ms = report.elapsed_ms as u64, "weight files written");
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenReport {
    pub num_docs: usize,
    pub skipped: usize,
    pub num_tokens: usize,
    pub distinct: usize,
}

/// Write one `<doc_id>.txt` token file per document plus corpus-wide
/// `sorted_by_frequency.txt` and `sorted_by_token.txt` reports.
pub fn dump_tokens(input: &Path, output: &Path, opts: &BuildOptions) -> Result<TokenReport> {
    let docs = list_documents(input)?;
    let tokenizer = Tokenizer::new(opts.stopwords.clone());
    let progress = Progress::new(docs.len());
    let tokenized: Vec<(&SourceDoc, Result<Vec<String>>)> = with_pool(opts.threads, || {
        docs.par_iter()
            .map(|doc| {
                let tokens = read_document(&doc.path, opts.extractor.as_ref()).map(|t| tokenizer.tokenize(&t));
                progress.tick();
                (doc, tokens)
            })
            .collect()
    })?;

    fs::create_dir_all(output)?;
    let mut report = TokenReport::default();
    let mut freq: HashMap<String, usize> = HashMap::new();
    for (doc, tokens) in tokenized {
        let tokens = match tokens {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(error = %err, "skipping document");
                report.skipped += 1;
                continue;
            }
        };
        let mut out = String::new();
        for t in &tokens {
            out.push_str(t);
            out.push('\n');
            *freq.entry(t.clone()).or_insert(0) += 1;
        }
        fs::write(output.join(format!("{}.txt", doc.doc_id)), out)?;
        report.num_docs += 1;
        report.num_tokens += tokens.len();
    }
    report.distinct = freq.len();

    let mut by_freq: Vec<(&String, &usize)> = freq.iter().collect();
    by_freq.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    fs::write(output.join("sorted_by_frequency.txt"), render_counts(&by_freq))?;

    let mut by_token = by_freq;
    by_token.sort_by(|a, b| a.0.cmp(b.0));
    fs::write(output.join("sorted_by_token.txt"), render_counts(&by_token))?;

    tracing::info!(docs = report.num_docs, tokens = report.num_tokens, distinct = report.distinct, "token dump complete");
    Ok(report)
}

fn render_counts(rows: &[(&String, &usize)]) -> String {
    let mut out = String::new();
    for (token, count) in rows {
        let _ = writeln!(out, "{token} \t {count}");
    }
    out
}
