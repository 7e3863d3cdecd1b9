use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A single corpus file could not be read. The build skips it.
    #[error("failed to read document {path}: {source}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document produced no terms after filtering. Never fatal.
    #[error("document {doc_id} has no indexable terms")]
    EmptyDocument { doc_id: String },

    /// The dictionary/postings pair is malformed or inconsistent.
    #[error("index corrupted in {file} at line {line}: {reason}")]
    IndexCorruption {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to load stopwords from {path}: {source}")]
    Stopwords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input path {0} is not a readable directory")]
    InputDir(PathBuf),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn corruption(file: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Error::IndexCorruption { file: file.into(), line, reason: reason.into() }
    }
}
