use crate::error::{Error, Result};
use scraper::{Html, Node};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Turns a raw file into the plain text handed to the tokenizer.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, raw: &str) -> String;
}

/// Visible text of an HTML document. Text nodes are joined with a space so
/// adjacent elements never fuse into one word.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlText;

impl TextExtractor for HtmlText {
    fn extract(&self, raw: &str) -> String {
        let doc = Html::parse_document(raw);
        let mut out = String::with_capacity(raw.len() / 2);
        for node in doc.root_element().descendants() {
            let Node::Text(text) = node.value() else { continue };
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element())
                .is_some_and(|el| matches!(el.name(), "script" | "style"));
            if hidden {
                continue;
            }
            out.push_str(text);
            out.push(' ');
        }
        out
    }
}

/// Pass-through for corpora that are already plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl TextExtractor for PlainText {
    fn extract(&self, raw: &str) -> String { raw.to_string() }
}

/// A corpus file and the id it is indexed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDoc {
    pub doc_id: String,
    pub path: PathBuf,
}

/// File name without its extension.
pub fn doc_id_from_path(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Regular files directly under `dir`, sorted by file name.
///
/// Two files with the same stem would share a doc id; the first in name
/// order wins and the others are skipped with a warning. Stems containing a
/// line break cannot be written to the line-oriented postings file and are
/// skipped too.
pub fn list_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<SourceDoc>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::InputDir(dir.to_path_buf()));
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let Some(doc_id) = doc_id_from_path(&path) else { continue };
        if doc_id.contains(['\n', '\r']) {
            tracing::warn!(path = %path.display(), "document id contains a line break, skipping");
            continue;
        }
        if !seen.insert(doc_id.clone()) {
            tracing::warn!(path = %path.display(), doc_id = %doc_id, "duplicate document id, skipping");
            continue;
        }
        docs.push(SourceDoc { doc_id, path });
    }
    Ok(docs)
}

/// Read a file and extract its text. Undecodable bytes become U+FFFD,
/// which the tokenizer treats as a separator.
pub fn read_document(path: &Path, extractor: &dyn TextExtractor) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| Error::DocumentRead { path: path.to_path_buf(), source })?;
    Ok(extractor.extract(&String::from_utf8_lossy(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn html_text_skips_scripts_and_separates_elements() {
        let html = "<html><head><title>Hi</title><style>p{}</style></head>\
                    <body><p>alpha</p><p>beta</p><script>var gamma;</script></body></html>";
        let text = HtmlText.extract(html);
        let words: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(words, vec!["Hi", "alpha", "beta"]);
    }

    #[test]
    fn lists_files_sorted_and_deduplicated() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.html"), "b").unwrap();
        fs::write(dir.path().join("a.html"), "a").unwrap();
        fs::write(dir.path().join("a.txt"), "dup").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.html"), "c").unwrap();

        let docs = list_documents(dir.path()).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(docs[0].path.ends_with("a.html"));
    }

    #[test]
    fn skips_file_names_with_line_breaks() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a\nb.txt"), "split name").unwrap();
        fs::write(dir.path().join("c\rd.txt"), "carriage return").unwrap();
        fs::write(dir.path().join("e.txt"), "fine").unwrap();

        let docs = list_documents(dir.path()).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["e"]);
    }

    #[test]
    fn missing_input_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let err = list_documents(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::InputDir(_)));
    }

    #[test]
    fn invalid_utf8_does_not_merge_words() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.txt");
        fs::write(&path, b"left\xffright").unwrap();
        let text = read_document(&path, &PlainText).unwrap();
        assert!(text.contains("left\u{fffd}right"));
    }
}
