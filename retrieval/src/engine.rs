//! Retrieval engine implementation.

use std::sync::Arc;
use std::time::Duration;

use docrag_embeddings::{
    EmbeddingError, EmbeddingProvider, HashingProvider, OpenAiProvider, RetryingProvider,
};
use docrag_vector_store::{EntryMetadata, IndexEntry, MetadataFilter, VectorIndex, VectorStore};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::config::{EmbeddingConfig, EmbeddingProviderType, RetrievalConfig};
use crate::error::{Result, RetrievalError};
use crate::result::SearchResult;
use crate::source::{Document, TextSource};

/// Model used with the OpenAI provider when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Chunks, embeds and indexes documents, and answers similarity queries.
///
/// The engine holds no mutable state of its own. Consistency between a
/// document and its index entries comes from the index applying each batch
/// atomically.
pub struct RetrievalEngine {
    chunker: Chunker,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    default_results: usize,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub doc_id: String,

    /// Number of chunks (and index entries) created.
    pub chunk_count: usize,

    /// Entries of a previous version removed by a re-ingest.
    pub replaced: usize,

    /// Characters across all chunk texts.
    pub indexed_chars: usize,
}

impl RetrievalEngine {
    /// Create a new engine builder.
    pub fn builder() -> RetrievalEngineBuilder {
        RetrievalEngineBuilder::new()
    }

    /// Create an engine, checking that provider and index agree on the
    /// vector dimension.
    pub fn new(
        chunker: Chunker,
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        if provider.dimension() != index.dimension() {
            return Err(RetrievalError::Configuration(format!(
                "embedding provider {} produces {}-dimensional vectors but the index expects {}",
                provider.name(),
                provider.dimension(),
                index.dimension()
            )));
        }
        Ok(Self {
            chunker,
            provider,
            index,
            default_results: 10,
        })
    }

    /// Build the provider and open the persisted collection described by
    /// `config`.
    pub async fn open(config: &RetrievalConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Opening collection {} in {}",
            config.collection.name,
            config.collection.data_dir.display()
        );

        let provider = build_provider(&config.embedding)?;
        let store =
            VectorStore::open_dir(config.collection_config(), &config.collection.data_dir).await?;

        Self::builder()
            .with_chunking(config.chunking.chunk_size, config.chunking.overlap)
            .with_default_results(config.search.default_results)
            .with_provider(provider)
            .with_index(Arc::new(store))
            .build()
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Number of results used when the caller does not choose one.
    pub fn default_results(&self) -> usize {
        self.default_results
    }

    /// Ingest `raw_text` as document `doc_id`, using the id as its source.
    pub async fn ingest(&self, doc_id: &str, raw_text: &str) -> Result<IngestReport> {
        self.ingest_document(&Document::new(doc_id, doc_id), raw_text)
            .await
    }

    /// Chunk, embed and index a document.
    ///
    /// Fails with `DuplicateEntry` if the document is already indexed. On any
    /// failure the index is left as it was.
    pub async fn ingest_document(&self, document: &Document, raw_text: &str) -> Result<IngestReport> {
        let (entries, report) = self.prepare(document, raw_text).await?;
        self.index.insert(entries).await?;

        info!(
            "Ingested {} as {} chunks",
            document.doc_id, report.chunk_count
        );
        Ok(report)
    }

    /// Extract the text of `document` through `source`, then ingest it.
    pub async fn ingest_from_source(
        &self,
        document: &Document,
        source: &dyn TextSource,
    ) -> Result<IngestReport> {
        let text = source.extract_text(&document.path()).await?;
        debug!(
            "Extracted {} characters from {}",
            text.chars().count(),
            document.source
        );
        self.ingest_document(document, &text).await
    }

    /// Replace every entry of `document` with a fresh ingest of `raw_text`.
    ///
    /// The old entries disappear and the new ones appear in one step.
    pub async fn reingest(&self, document: &Document, raw_text: &str) -> Result<IngestReport> {
        let (entries, mut report) = self.prepare(document, raw_text).await?;
        report.replaced = self
            .index
            .replace(&MetadataFilter::DocId(document.doc_id.clone()), entries)
            .await?;

        info!(
            "Re-ingested {} as {} chunks, replacing {}",
            document.doc_id, report.chunk_count, report.replaced
        );
        Ok(report)
    }

    /// Chunk and embed a document into index entries without touching the
    /// index.
    async fn prepare(
        &self,
        document: &Document,
        raw_text: &str,
    ) -> Result<(Vec<IndexEntry>, IngestReport)> {
        if document.doc_id.trim().is_empty() {
            return Err(RetrievalError::EmptyInput("document id is empty".to_string()));
        }
        if raw_text.trim().is_empty() {
            return Err(RetrievalError::EmptyInput(format!(
                "document {} has no text",
                document.doc_id
            )));
        }

        let chunks = self.chunker.chunk_document(&document.doc_id, raw_text);
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyInput(format!(
                "document {} produced no chunks",
                document.doc_id
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.provider.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "requested {} embeddings, received {}",
                chunks.len(),
                vectors.len()
            ))
            .into());
        }
        let dimension = self.index.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            }
            .into());
        }

        let total_chunks = chunks.len();
        let indexed_chars = chunks.iter().map(|chunk| chunk.char_length).sum();
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let metadata = EntryMetadata {
                    doc_id: chunk.doc_id,
                    chunk_index: chunk.chunk_index,
                    total_chunks,
                    source: document.source.clone(),
                    chunk_size: chunk.char_length,
                };
                IndexEntry::for_chunk(vector, chunk.text, metadata)
            })
            .collect();

        let report = IngestReport {
            doc_id: document.doc_id.clone(),
            chunk_count: total_chunks,
            replaced: 0,
            indexed_chars,
        };
        Ok((entries, report))
    }

    /// Search for the `n_results` chunks most similar to `query`.
    ///
    /// Failures are logged and reported as an empty result; use
    /// [`RetrievalEngine::try_search`] to tell them apart from "no matches".
    pub async fn search(&self, query: &str, n_results: usize) -> Vec<SearchResult> {
        match self.try_search(query, n_results).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed, returning no results: {e}");
                Vec::new()
            }
        }
    }

    /// Search for the `n_results` chunks most similar to `query`, ordered by
    /// descending score.
    pub async fn try_search(&self, query: &str, n_results: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyInput("search query is empty".to_string()));
        }
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let vector = self.provider.embed(query).await?;
        if vector.len() != self.index.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: vector.len(),
            }
            .into());
        }

        let hits = self.index.query(&vector, n_results).await?;
        let mut results = hits
            .into_iter()
            .map(SearchResult::from_hit)
            .collect::<Result<Vec<_>>>()?;
        // Stable: equal scores keep the index order.
        results.sort_by(|a, b| b.score().total_cmp(&a.score()));

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Remove every entry of `doc_id`. Unknown ids remove nothing.
    pub async fn remove(&self, doc_id: &str) -> Result<usize> {
        let removed = self
            .index
            .delete(&MetadataFilter::DocId(doc_id.to_string()))
            .await?;
        if removed > 0 {
            info!("Removed {removed} entries of {doc_id}");
        } else {
            debug!("No entries to remove for {doc_id}");
        }
        Ok(removed)
    }
}

/// Create the embedding provider described by `config`.
pub fn build_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderType::Hashing => {
            let provider = HashingProvider::new(config.dimension)?;
            Ok(Arc::new(provider))
        }
        EmbeddingProviderType::OpenAi => {
            let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
            let mut provider = OpenAiProvider::new(model, config.dimension);
            if let Some(key) = &config.api_key {
                provider = provider.with_api_key(key);
            }
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            if !provider.is_available() {
                return Err(RetrievalError::Configuration(
                    "the openai provider needs embedding.api_key or OPENAI_API_KEY".to_string(),
                ));
            }
            Ok(Arc::new(
                RetryingProvider::new(provider, config.max_retries)
                    .with_max_delay(Duration::from_millis(config.retry_max_delay_ms)),
            ))
        }
    }
}

/// Builder for [`RetrievalEngine`].
pub struct RetrievalEngineBuilder {
    chunk_size: usize,
    overlap: usize,
    default_results: usize,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
}

impl RetrievalEngineBuilder {
    /// Create a new builder with the default chunking parameters.
    pub fn new() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            overlap: crate::config::DEFAULT_OVERLAP,
            default_results: 10,
            provider: None,
            index: None,
        }
    }

    /// Set the chunk size and overlap, in characters.
    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.overlap = overlap;
        self
    }

    /// Set the default number of search results.
    pub fn with_default_results(mut self, n_results: usize) -> Self {
        self.default_results = n_results;
        self
    }

    /// Set the embedding provider.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the vector index.
    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<RetrievalEngine> {
        let chunker = Chunker::new(self.chunk_size, self.overlap)?;
        let provider = self.provider.ok_or_else(|| {
            RetrievalError::Configuration("no embedding provider configured".to_string())
        })?;
        let index = self
            .index
            .ok_or_else(|| RetrievalError::Configuration("no vector index configured".to_string()))?;

        let mut engine = RetrievalEngine::new(chunker, provider, index)?;
        engine.default_results = self.default_results.max(1);
        Ok(engine)
    }
}

impl Default for RetrievalEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
