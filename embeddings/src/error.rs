//! Error types for embedding providers.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur while computing embeddings.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured (missing API key, empty model name, ...).
    #[error("embedding provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// The provider answered with a non-success status.
    #[error("API request failed with status {status}: {message}")]
    ApiRequest { status: u16, message: String },

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// Rate limits, transport failures and server-side errors are transient;
    /// configuration problems and malformed responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Http(_) => true,
            Self::ApiRequest { status, .. } => *status >= 500,
            Self::ProviderNotConfigured(_)
            | Self::InvalidResponse(_)
            | Self::DimensionMismatch { .. }
            | Self::Serialization(_) => false,
        }
    }
}
