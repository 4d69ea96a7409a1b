//! Error types for the vector store.

use thiserror::Error;

/// Result type alias for vector store operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur in the vector store.
#[derive(Error, Debug)]
pub enum IndexError {
    /// An entry with this id is already indexed (or repeats within a batch).
    #[error("duplicate entry id: {0}")]
    DuplicateEntry(String),

    /// Vector has the wrong number of components.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector contains NaN or infinite components.
    #[error("vector for {0} has non-finite components")]
    InvalidVector(String),

    /// The collection was destroyed and could not be recreated.
    #[error("collection unavailable: {0}")]
    CollectionUnavailable(String),

    /// Invalid collection configuration.
    #[error("invalid collection configuration: {0}")]
    InvalidConfig(String),

    /// The backing store failed or holds unusable data.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
