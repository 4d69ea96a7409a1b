//! Offline feature-hashing embeddings.
//!
//! Each lowercase alphanumeric token is hashed into one of `dimension`
//! buckets and the resulting term-frequency vector is L2-normalised. The
//! output depends only on the input text and the dimension, which makes the
//! provider usable without network access and as a deterministic stand-in
//! for a model in tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;

/// Deterministic bag-of-words embedding provider.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
    model: String,
}

impl HashingProvider {
    /// Create a provider producing `dimension`-sized vectors.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::ProviderNotConfigured(
                "hashing provider needs a non-zero dimension".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            model: format!("feature-hash-sha256-d{dimension}"),
        })
    }

    /// Split text into lowercase alphanumeric tokens.
    pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    /// Bucket a token falls into.
    pub fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % self.dimension as u64) as usize
    }

    /// Compute the embedding of `text` synchronously.
    ///
    /// Text without any token maps to the zero vector.
    pub fn vectorize(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        for token in Self::tokens(text) {
            vector[self.bucket(&token)] += 1.0;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
