//! Search results and score conversion.

use docrag_vector_store::{EntryMetadata, QueryHit};
use serde::Serialize;

use crate::error::{Result, RetrievalError};

/// Convert an index distance into a similarity score in `(0, 1]`.
///
/// Distance 0 maps to 1 and larger distances map to smaller scores.
/// Negative or NaN distances are treated as 0; the score never drops below
/// `f64::MIN_POSITIVE`, even for infinite distances.
pub fn distance_to_score(distance: f32) -> f64 {
    let distance = f64::from(distance).max(0.0);
    (1.0 / (1.0 + distance)).max(f64::MIN_POSITIVE)
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    doc_id: String,
    text: String,
    score: f64,
    metadata: EntryMetadata,
}

impl SearchResult {
    /// Build a result, rejecting scores outside `(0, 1]`.
    pub fn new(
        doc_id: impl Into<String>,
        text: impl Into<String>,
        score: f64,
        metadata: EntryMetadata,
    ) -> Result<Self> {
        if score.is_nan() || score <= 0.0 || score > 1.0 {
            return Err(RetrievalError::InvalidScore(score));
        }
        Ok(Self {
            doc_id: doc_id.into(),
            text: text.into(),
            score,
            metadata,
        })
    }

    /// Build a result from an index hit.
    pub fn from_hit(hit: QueryHit) -> Result<Self> {
        let score = distance_to_score(hit.distance);
        let entry = hit.entry;
        Self::new(entry.metadata.doc_id.clone(), entry.text, score, entry.metadata)
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn metadata(&self) -> &EntryMetadata {
        &self.metadata
    }
}
