//! Index entries and metadata filters.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Metadata stored alongside every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Identifier of the owning document.
    pub doc_id: String,

    /// Position of the chunk within its document (0-based).
    pub chunk_index: usize,

    /// Number of chunks the document was split into.
    pub total_chunks: usize,

    /// Reference to the source artifact (path, URL, ...).
    pub source: String,

    /// Length of the chunk text in characters.
    pub chunk_size: usize,
}

/// An entry in the vector index: one chunk, its embedding and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique identifier, see [`IndexEntry::chunk_id`].
    pub id: String,

    /// The embedding vector.
    pub vector: Vec<f32>,

    /// The chunk text.
    pub text: String,

    /// Associated metadata.
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Build the entry id of chunk `chunk_index` of `doc_id`.
    ///
    /// The chunk index is numeric, so distinct (doc_id, chunk_index) pairs
    /// never produce the same id.
    pub fn chunk_id(doc_id: &str, chunk_index: usize) -> String {
        format!("{doc_id}_chunk_{chunk_index}")
    }

    /// Create an entry whose id is derived from its metadata.
    pub fn for_chunk(vector: Vec<f32>, text: impl Into<String>, metadata: EntryMetadata) -> Self {
        Self {
            id: Self::chunk_id(&metadata.doc_id, metadata.chunk_index),
            vector,
            text: text.into(),
            metadata,
        }
    }

    /// Check the vector against the collection dimension.
    pub(crate) fn validate(&self, dimension: usize) -> Result<()> {
        if self.vector.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: self.vector.len(),
            });
        }
        if self.vector.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::InvalidVector(self.id.clone()));
        }
        Ok(())
    }
}

/// Predicate over entry metadata, used for deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFilter {
    /// Entries belonging to a document.
    DocId(String),
}

impl MetadataFilter {
    /// Check whether `metadata` satisfies this filter.
    pub fn matches(&self, metadata: &EntryMetadata) -> bool {
        match self {
            Self::DocId(doc_id) => metadata.doc_id == *doc_id,
        }
    }
}

/// A nearest-neighbor query hit.
#[derive(Debug, Clone)]
pub struct QueryHit {
    /// The matched entry.
    pub entry: IndexEntry,

    /// Distance to the query vector (smaller is closer).
    pub distance: f32,
}
