//! Embedding providers.
//!
//! The retrieval core only depends on the [`EmbeddingProvider`] trait.
//! [`OpenAiProvider`] talks to any OpenAI-compatible `/embeddings` endpoint
//! (OpenAI itself, a local inference server, a gateway).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Default base URL of the OpenAI API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Trait for embedding providers.
///
/// Implementations must be deterministic for a given model version and must
/// always return vectors of [`EmbeddingProvider::dimension`] components.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the model this provider embeds with.
    fn model(&self) -> &str;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts.
    ///
    /// The output has the same length and order as `texts`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        // Default implementation: process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// OpenAI-compatible embedding provider.
pub struct OpenAiProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model name sent with every request.
    model: String,

    /// Expected dimension of the returned vectors.
    dimension: usize,
}

impl OpenAiProvider {
    /// Create a new provider for `model`, expecting `dimension`-sized vectors.
    ///
    /// The API key is read from `OPENAI_API_KEY` unless set explicitly.
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: OPENAI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            model: model.into(),
            dimension,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check if the provider has the credentials it needs.
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            EmbeddingError::ProviderNotConfigured("OPENAI_API_KEY is not set".to_string())
        })?;

        debug!(
            "Requesting {} embeddings with model: {}",
            texts.len(),
            self.model
        );

        let body = serde_json::json!({
            "input": texts,
            "model": self.model,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest {
                status: status.as_u16(),
                message,
            });
        }

        let mut result: OpenAiEmbeddingResponse = response.json().await?;
        if result.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                result.data.len()
            )));
        }

        // The API does not promise response order; `index` does.
        result.data.sort_by_key(|item| item.index);

        let mut embeddings = Vec::with_capacity(result.data.len());
        for (position, item) in result.data.into_iter().enumerate() {
            if item.index != position {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "missing embedding for input {position}"
                )));
            }
            if item.embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: item.embedding.len(),
                });
            }
            embeddings.push(item.embedding);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.request(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.request(texts).await?;
        info!("Generated {} batch embeddings", embeddings.len());
        Ok(embeddings)
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
