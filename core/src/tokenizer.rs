use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[a-z]+").expect("valid regex");
}

/// Single-letter words that survive the length filter.
const SHORT_WORDS: [&str; 2] = ["a", "i"];

/// Immutable stopword set, loaded once and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn empty() -> Self { Self::default() }

    /// Load a newline-delimited list, one word per line. Blank lines are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| Error::Stopwords { path: path.to_path_buf(), source })?;
        Ok(Self::from_lines(&text))
    }

    pub fn from_lines(text: &str) -> Self {
        let words = text
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { words }
    }

    pub fn contains(&self, term: &str) -> bool { self.words.contains(term) }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

impl<S: Into<String>> FromIterator<S> for Stopwords {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { words: iter.into_iter().map(|s| s.into().to_lowercase()).collect() }
    }
}

/// Turns extracted document text into index terms.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    stopwords: Stopwords,
}

impl Tokenizer {
    pub fn new(stopwords: Stopwords) -> Self { Self { stopwords } }

    pub fn stopwords(&self) -> &Stopwords { &self.stopwords }

    /// Lowercase, split into maximal ASCII letter runs, drop short words and stopwords.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        RE.find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| t.len() >= 2 || SHORT_WORDS.contains(t))
            .filter(|t| !self.stopwords.contains(t))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = Tokenizer::default().tokenize("Hello, World! x I a");
        assert_eq!(t, vec!["hello", "world", "i", "a"]);
    }

    #[test]
    fn separators_do_not_merge_words() {
        let t = Tokenizer::default().tokenize("foo123bar baz-qux don't");
        assert_eq!(t, vec!["foo", "bar", "baz", "qux", "don"]);
    }

    #[test]
    fn stopwords_are_case_insensitive() {
        let sw: Stopwords = ["The", "and"].into_iter().collect();
        let t = Tokenizer::new(sw).tokenize("THE cat AND the dog");
        assert_eq!(t, vec!["cat", "dog"]);
    }

    #[test]
    fn stopword_file_ignores_blank_lines() {
        let sw = Stopwords::from_lines("the\n\n  of  \n");
        assert_eq!(sw.len(), 2);
        assert!(sw.contains("of"));
    }
}
