//! Cosine-ranked term index over a directory of HTML documents.
//!
//! Indexing runs [`tokenizer`] → [`stats`] → [`weighting`] → [`persist`];
//! [`build::build_index`] drives the whole batch. Querying only needs the
//! files [`persist`] writes: open them with [`QueryEngine::open`].

pub mod build;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod stats;
pub mod tokenizer;
pub mod weighting;

pub type TermId = u32;
/// Position of a document in processing order.
pub type DocIdx = u32;

pub use build::{build_index, BuildOptions, BuildReport};
pub use error::{Error, Result};
pub use index::{DictEntry, Index, Posting};
pub use query::{Hit, QueryEngine, SearchOptions, SearchResults, TermStatus};
pub use tokenizer::{Stopwords, Tokenizer};
pub use weighting::IdfMode;
