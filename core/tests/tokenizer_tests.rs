use sift_core::tokenizer::{Stopwords, Tokenizer};

#[test]
fn it_lowercases_and_splits_on_non_letters() {
    let toks = Tokenizer::default().tokenize("Running Runners RUN! The café's menu.");
    assert_eq!(toks, vec!["running", "runners", "run", "the", "caf", "menu"]);
}

#[test]
fn it_keeps_a_and_i_only() {
    let toks = Tokenizer::default().tokenize("I saw a b c x-ray");
    assert_eq!(toks, vec!["i", "saw", "a", "ray"]);
}

#[test]
fn it_filters_stopwords() {
    let sw = Stopwords::from_lines("the\nand\n");
    let toks = Tokenizer::new(sw).tokenize("The quick brown fox and the lazy dog");
    assert!(!toks.contains(&"the".to_string()));
    assert!(!toks.contains(&"and".to_string()));
    assert_eq!(toks, vec!["quick", "brown", "fox", "lazy", "dog"]);
}

#[test]
fn it_loads_the_bundled_stopword_list() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../stopwords.txt");
    let sw = Stopwords::from_file(path).unwrap();
    assert!(sw.contains("the"));
    let toks = Tokenizer::new(sw).tokenize("the cat sat on the mat");
    assert_eq!(toks, vec!["cat", "sat", "mat"]);
}

#[test]
fn missing_stopword_file_is_an_error() {
    assert!(Stopwords::from_file("/definitely/not/here.txt").is_err());
}
