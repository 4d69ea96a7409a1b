//! # Embeddings
//!
//! Embedding providers for the docrag retrieval core.
//!
//! ## Features
//!
//! - **Provider trait**: the single seam the retrieval engine embeds through
//! - **OpenAI-compatible HTTP provider**: batch requests, ordered responses
//! - **Offline hashing provider**: deterministic vectors without a model
//! - **Retries**: exponential backoff for transient provider failures
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Embedding Providers                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  RetryingProvider ──► EmbeddingProvider ──► Embedding           │
//! │                            │                                    │
//! │                            ▼                                    │
//! │                 OpenAiProvider / HashingProvider                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod hashing;
pub mod provider;
pub mod retry;

pub use error::{EmbeddingError, Result};
pub use hashing::HashingProvider;
pub use provider::{EmbeddingProvider, OPENAI_BASE_URL, OpenAiProvider};
pub use retry::RetryingProvider;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Default embedding dimension, used by the feature-hashing provider.
pub const DEFAULT_DIMENSION: usize = 384;
