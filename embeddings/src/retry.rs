//! Retrying wrapper for embedding providers.

use std::time::Duration;

use async_trait::async_trait;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::warn;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;

/// Wraps a provider and retries transient failures with exponential backoff.
///
/// Only errors for which [`EmbeddingError::is_transient`] holds are retried;
/// everything else is returned on the first attempt.
pub struct RetryingProvider<P> {
    inner: P,
    max_retries: usize,
    backoff_factor_ms: u64,
    max_delay: Duration,
}

impl<P> RetryingProvider<P>
where
    P: EmbeddingProvider,
{
    /// Wrap `inner`, allowing up to `max_retries` additional attempts.
    pub fn new(inner: P, max_retries: usize) -> Self {
        Self {
            inner,
            max_retries,
            backoff_factor_ms: 50,
            max_delay: Duration::from_secs(10),
        }
    }

    /// Set the backoff factor. Delays are `factor * 2^attempt` milliseconds.
    pub fn with_backoff_factor(mut self, factor_ms: u64) -> Self {
        self.backoff_factor_ms = factor_ms.max(1);
        self
    }

    /// Cap the delay between two attempts.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Get the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.backoff_factor_ms)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_retries)
    }

    fn should_retry(&self, error: &EmbeddingError) -> bool {
        let transient = error.is_transient();
        if transient {
            warn!("Transient embedding failure from {}: {error}", self.inner.name());
        }
        transient
    }
}

#[async_trait]
impl<P> EmbeddingProvider for RetryingProvider<P>
where
    P: EmbeddingProvider,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        RetryIf::spawn(
            self.strategy(),
            || self.inner.embed(text),
            |error: &EmbeddingError| self.should_retry(error),
        )
        .await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        RetryIf::spawn(
            self.strategy(),
            || self.inner.embed_batch(texts),
            |error: &EmbeddingError| self.should_retry(error),
        )
        .await
    }
}
