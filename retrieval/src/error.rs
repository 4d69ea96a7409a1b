//! Error types for the retrieval engine.

use std::path::PathBuf;

use docrag_embeddings::EmbeddingError;
use docrag_vector_store::IndexError;
use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The text to ingest (or search for) has no content.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Invalid configuration (chunking parameters, dimensions, config file).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The embedding provider failed or returned unusable vectors.
    #[error("embedding provider error: {0}")]
    Provider(#[from] EmbeddingError),

    /// The vector index rejected the operation.
    #[error("index error: {0}")]
    Index(IndexError),

    /// An entry id is already present in the index.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// The collection was destroyed and has not been recreated.
    #[error("collection unavailable: {0}")]
    CollectionUnavailable(String),

    /// A search score fell outside `(0, 1]`.
    #[error("score {0} is outside (0, 1]")]
    InvalidScore(f64),

    /// Text could not be extracted from a source document.
    #[error("extraction error: {0}")]
    Extraction(#[from] SourceError),
}

impl From<IndexError> for RetrievalError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DuplicateEntry(id) => Self::DuplicateEntry(id),
            IndexError::CollectionUnavailable(reason) => Self::CollectionUnavailable(reason),
            other => Self::Index(other),
        }
    }
}

/// Errors raised by text sources.
#[derive(Error, Debug)]
pub enum SourceError {
    /// No extractor is registered for the document's format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source artifact could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact was read but its text could not be extracted.
    #[error("failed to extract text from {}: {message}", path.display())]
    Extract { path: PathBuf, message: String },
}
