//! On-disk layout of an index directory.
//!
//! * `dictionary.txt`: 4-line records `term\n{doc_count}\n{offset}\n\n`
//! * `postings.txt`: one `{doc_id}, {weight}` line per posting
//! * `meta.json`: counts and CRC-32 checksums of the two files above
//!
//! Each file is written to a temporary sibling and renamed into place,
//! postings first and `meta.json` last. A reader that catches the directory
//! between renames sees checksums that disagree with the pair and fails
//! with [`Error::IndexCorruption`] instead of ranking against a mixed index.

use crate::error::{Error, Result};
use crate::index::{DictEntry, Index, Posting};
use crate::weighting::WeightedCorpus;
use crate::DocIdx;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_docs: u32,
    pub num_terms: u32,
    pub num_postings: u32,
    pub created_at: String,
    pub dictionary_crc32: u32,
    pub postings_crc32: u32,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn dictionary(&self) -> PathBuf { self.root.join("dictionary.txt") }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn render_dictionary(corpus: &WeightedCorpus) -> String {
    let mut out = String::new();
    let mut offset = 0usize;
    for t in &corpus.terms {
        let doc_count = t.postings.len();
        let _ = write!(out, "{}\n{}\n{}\n\n", t.term, doc_count, offset);
        offset += doc_count;
    }
    out
}

pub fn render_postings(corpus: &WeightedCorpus) -> String {
    let mut out = String::new();
    for t in &corpus.terms {
        for &(doc, weight) in &t.postings {
            let _ = writeln!(out, "{}, {}", corpus.doc_ids[doc as usize], weight);
        }
    }
    out
}

fn publish(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Serialize the corpus and publish the dictionary/postings pair plus `meta.json`.
pub fn write_index(paths: &IndexPaths, corpus: &WeightedCorpus) -> Result<MetaFile> {
    fs::create_dir_all(&paths.root)?;
    let dictionary = render_dictionary(corpus);
    let postings = render_postings(corpus);

    let meta = MetaFile {
        version: FORMAT_VERSION,
        num_docs: corpus.num_docs() as u32,
        num_terms: corpus.terms.len() as u32,
        num_postings: corpus.num_postings() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        dictionary_crc32: crc32fast::hash(dictionary.as_bytes()),
        postings_crc32: crc32fast::hash(postings.as_bytes()),
    };

    publish(&paths.root, &paths.postings(), postings.as_bytes())?;
    publish(&paths.root, &paths.dictionary(), dictionary.as_bytes())?;
    save_meta(paths, &meta)?;
    tracing::info!(
        root = %paths.root.display(),
        terms = meta.num_terms,
        postings = meta.num_postings,
        "index published"
    );
    Ok(meta)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    fs::create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    publish(&paths.root, &paths.meta(), json.as_bytes())
}

/// Read `meta.json`. An unreadable or malformed file counts as corruption.
pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let buf = fs::read_to_string(&path).map_err(|e| Error::corruption(&path, 0, format!("unreadable: {e}")))?;
    serde_json::from_str(&buf).map_err(|e| Error::corruption(&path, e.line(), format!("malformed: {e}")))
}

/// Parse dictionary records, checking that offsets tile `[0, total)` without gaps.
pub fn parse_dictionary(text: &str, file: &Path) -> Result<(Vec<(String, DictEntry)>, usize)> {
    let lines: Vec<&str> = text.split('\n').collect();
    // a well-formed file ends with the separator's newline, leaving one empty tail
    let body = match lines.split_last() {
        Some((last, body)) if last.is_empty() => body,
        Some(_) => return Err(Error::corruption(file, lines.len(), "missing trailing newline")),
        None => &[][..],
    };
    if body.len() % 4 != 0 {
        return Err(Error::corruption(file, body.len(), "truncated dictionary record"));
    }

    let mut entries: Vec<(String, DictEntry)> = Vec::with_capacity(body.len() / 4);
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut expected_offset = 0usize;
    for (i, rec) in body.chunks(4).enumerate() {
        let line = i * 4 + 1;
        let term = rec[0];
        if term.is_empty() || term.chars().any(char::is_whitespace) {
            return Err(Error::corruption(file, line, format!("invalid term {term:?}")));
        }
        if let Some(prev) = seen.insert(term, line) {
            return Err(Error::corruption(file, line, format!("term {term:?} already defined at line {prev}")));
        }
        let doc_count: u32 = rec[1]
            .parse()
            .map_err(|_| Error::corruption(file, line + 1, format!("bad doc count {:?}", rec[1])))?;
        if doc_count == 0 {
            return Err(Error::corruption(file, line + 1, "empty postings list"));
        }
        let offset: usize = rec[2]
            .parse()
            .map_err(|_| Error::corruption(file, line + 2, format!("bad offset {:?}", rec[2])))?;
        if offset != expected_offset {
            return Err(Error::corruption(
                file,
                line + 2,
                format!("offset {offset} does not follow previous range ending at {expected_offset}"),
            ));
        }
        if !rec[3].is_empty() {
            return Err(Error::corruption(file, line + 3, "missing record separator"));
        }
        expected_offset += doc_count as usize;
        entries.push((term.to_string(), DictEntry { doc_count, offset }));
    }
    Ok((entries, expected_offset))
}

/// Parse postings lines into (doc_id, weight) pairs.
pub fn parse_postings(text: &str, file: &Path) -> Result<Vec<(String, f64)>> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        // doc ids come from file names and may contain commas; weights never do
        let (doc, weight) = line
            .rsplit_once(',')
            .ok_or_else(|| Error::corruption(file, i + 1, "expected `doc_id, weight`"))?;
        if doc.is_empty() {
            return Err(Error::corruption(file, i + 1, "empty doc id"));
        }
        let weight: f64 = weight
            .trim()
            .parse()
            .map_err(|_| Error::corruption(file, i + 1, format!("bad weight {:?}", weight.trim())))?;
        if !weight.is_finite() {
            return Err(Error::corruption(file, i + 1, "non-finite weight"));
        }
        out.push((doc.to_string(), weight));
    }
    Ok(out)
}

fn check_counts(paths: &IndexPaths, meta: &MetaFile, num_terms: usize, num_postings: usize) -> Result<()> {
    if meta.num_terms as usize != num_terms {
        return Err(Error::corruption(
            paths.meta(),
            0,
            format!("num_terms is {} but dictionary holds {num_terms}", meta.num_terms),
        ));
    }
    if meta.num_postings as usize != num_postings {
        return Err(Error::corruption(
            paths.meta(),
            0,
            format!("num_postings is {} but postings file holds {num_postings}", meta.num_postings),
        ));
    }
    Ok(())
}

/// Load and validate an index directory. Any inconsistency is fatal.
pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    let dict_path = paths.dictionary();
    let post_path = paths.postings();
    let dict_text = fs::read_to_string(&dict_path)?;
    let post_text = fs::read_to_string(&post_path)?;

    let meta = if paths.meta().exists() {
        let meta = load_meta(paths)?;
        if meta.version != FORMAT_VERSION {
            return Err(Error::corruption(paths.meta(), 0, format!("unsupported version {}", meta.version)));
        }
        if crc32fast::hash(dict_text.as_bytes()) != meta.dictionary_crc32 {
            return Err(Error::corruption(&dict_path, 0, "checksum does not match meta.json"));
        }
        if crc32fast::hash(post_text.as_bytes()) != meta.postings_crc32 {
            return Err(Error::corruption(&post_path, 0, "checksum does not match meta.json"));
        }
        Some(meta)
    } else {
        tracing::warn!(root = %paths.root.display(), "meta.json missing, skipping checksum validation");
        None
    };

    let (entries, total) = parse_dictionary(&dict_text, &dict_path)?;
    let raw = parse_postings(&post_text, &post_path)?;
    if raw.len() != total {
        return Err(Error::corruption(
            &post_path,
            raw.len(),
            format!("dictionary addresses {total} postings but file holds {}", raw.len()),
        ));
    }
    if let Some(meta) = &meta {
        check_counts(paths, meta, entries.len(), raw.len())?;
    }

    let mut doc_ids: Vec<String> = Vec::new();
    let mut interned: HashMap<String, DocIdx> = HashMap::new();
    let mut postings = Vec::with_capacity(raw.len());
    for (doc, weight) in raw {
        let idx = match interned.get(&doc) {
            Some(&idx) => idx,
            None => {
                let idx = doc_ids.len() as DocIdx;
                interned.insert(doc.clone(), idx);
                doc_ids.push(doc);
                idx
            }
        };
        postings.push(Posting { doc: idx, weight });
    }

    // documents without postings are counted in meta.json but absent here
    if let Some(meta) = &meta {
        if doc_ids.len() > meta.num_docs as usize {
            return Err(Error::corruption(
                paths.meta(),
                0,
                format!("num_docs is {} but postings name {} documents", meta.num_docs, doc_ids.len()),
            ));
        }
    }

    // a document may appear at most once per term
    for (term, entry) in &entries {
        let mut docs: Vec<DocIdx> = postings[entry.range()].iter().map(|p| p.doc).collect();
        docs.sort_unstable();
        if docs.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::corruption(&post_path, entry.offset + 1, format!("duplicate document in postings of {term:?}")));
        }
    }

    tracing::info!(terms = entries.len(), postings = postings.len(), docs = doc_ids.len(), "index loaded");
    Ok(Index::from_parts(entries, postings, doc_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::WeightedTerm;
    use tempfile::tempdir;

    fn sample() -> WeightedCorpus {
        WeightedCorpus {
            doc_ids: vec!["doc1".into(), "doc2".into(), "doc3".into()],
            terms: vec![
                WeightedTerm { term: "dog".into(), postings: vec![(0, 0.5), (1, 1.0)] },
                WeightedTerm { term: "cat".into(), postings: vec![(1, 0.25), (2, 0.75), (0, 0.125)] },
            ],
        }
    }

    #[test]
    fn dictionary_format() {
        assert_eq!(render_dictionary(&sample()), "dog\n2\n0\n\ncat\n3\n2\n\n");
        assert_eq!(
            render_postings(&sample()),
            "doc1, 0.5\ndoc2, 1\ndoc2, 0.25\ndoc3, 0.75\ndoc1, 0.125\n"
        );
    }

    #[test]
    fn write_then_load() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let meta = write_index(&paths, &sample()).unwrap();
        assert_eq!(meta.num_terms, 2);
        assert_eq!(meta.num_postings, 5);
        let index = load_index(&paths).unwrap();
        let cat = index.lookup("cat").unwrap();
        let docs: Vec<&str> = index.postings(cat).iter().map(|p| index.doc_id(p.doc)).collect();
        assert_eq!(docs, vec!["doc2", "doc3", "doc1"]);
        assert_eq!(index.postings(cat)[2].weight, 0.125);
    }

    #[test]
    fn rejects_gap_between_ranges() {
        let err = parse_dictionary("dog\n2\n0\n\ncat\n3\n3\n\n", Path::new("d")).unwrap_err();
        assert!(matches!(err, Error::IndexCorruption { line: 7, .. }), "{err}");
    }

    #[test]
    fn rejects_missing_separator() {
        let err = parse_dictionary("dog\n2\n0\nx\n", Path::new("d")).unwrap_err();
        assert!(matches!(err, Error::IndexCorruption { .. }));
    }

    #[test]
    fn empty_dictionary_is_valid() {
        let (entries, total) = parse_dictionary("", Path::new("d")).unwrap();
        assert!(entries.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn rejects_postings_shorter_than_dictionary() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        fs::write(paths.dictionary(), "dog\n2\n0\n\n").unwrap();
        fs::write(paths.postings(), "doc1, 0.5\n").unwrap();
        let err = load_index(&paths).unwrap_err();
        assert!(matches!(err, Error::IndexCorruption { .. }), "{err}");
    }

    #[test]
    fn rejects_bad_weight() {
        let err = parse_postings("doc1, 0.5\ndoc2, heavy\n", Path::new("p")).unwrap_err();
        assert!(matches!(err, Error::IndexCorruption { line: 2, .. }));
    }

    #[test]
    fn doc_ids_may_contain_commas() {
        let parsed = parse_postings("a, b, 0.5\n", Path::new("p")).unwrap();
        assert_eq!(parsed, vec![("a, b".to_string(), 0.5)]);
    }

    fn rewrite_meta(paths: &IndexPaths, edit: impl FnOnce(&mut MetaFile)) {
        let mut meta = load_meta(paths).unwrap();
        edit(&mut meta);
        save_meta(paths, &meta).unwrap();
    }

    #[test]
    fn rejects_term_count_disagreeing_with_meta() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        write_index(&paths, &sample()).unwrap();
        rewrite_meta(&paths, |m| m.num_terms = 999);
        let err = load_index(&paths).unwrap_err();
        assert!(matches!(&err, Error::IndexCorruption { file, .. } if file.ends_with("meta.json")), "{err}");
    }

    #[test]
    fn rejects_posting_count_disagreeing_with_meta() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        write_index(&paths, &sample()).unwrap();
        rewrite_meta(&paths, |m| m.num_postings = 12345);
        let err = load_index(&paths).unwrap_err();
        assert!(matches!(err, Error::IndexCorruption { .. }), "{err}");
    }

    #[test]
    fn rejects_doc_count_below_postings_documents() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        write_index(&paths, &sample()).unwrap();
        rewrite_meta(&paths, |m| m.num_docs = 1);
        let err = load_index(&paths).unwrap_err();
        assert!(matches!(err, Error::IndexCorruption { .. }), "{err}");
    }

    #[test]
    fn garbled_meta_is_corruption() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        write_index(&paths, &sample()).unwrap();
        fs::write(paths.meta(), "{ garbage").unwrap();
        let err = load_index(&paths).unwrap_err();
        assert!(matches!(&err, Error::IndexCorruption { file, .. } if file.ends_with("meta.json")), "{err}");
    }

    #[test]
    fn detects_pair_mismatch_against_meta() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        write_index(&paths, &sample()).unwrap();
        // a postings file from a different build, same shape
        fs::write(paths.postings(), "doc1, 0.6\ndoc2, 1\ndoc2, 0.25\ndoc3, 0.75\ndoc1, 0.125\n").unwrap();
        let err = load_index(&paths).unwrap_err();
        assert!(matches!(err, Error::IndexCorruption { .. }), "{err}");
    }
}
