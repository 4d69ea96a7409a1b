//! End-to-end ingest, search and administration scenarios.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use docrag_embeddings::{Embedding, EmbeddingError, EmbeddingProvider, HashingProvider};
use docrag_retrieval::config::StatsConfig;
use docrag_retrieval::{
    CollectionAdmin, Document, RetrievalEngine, RetrievalError, SourceRegistry, VectorIndex,
    VectorStore,
};
use docrag_vector_store::{Collection, CollectionBackend, CollectionConfig, IndexError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const DIMENSION: usize = 384;

fn store() -> Arc<VectorStore> {
    Arc::new(VectorStore::in_memory(CollectionConfig::new("skillsheets", DIMENSION)).unwrap())
}

fn engine_with(provider: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> RetrievalEngine {
    RetrievalEngine::builder()
        .with_chunking(1000, 200)
        .with_provider(provider)
        .with_index(index)
        .build()
        .unwrap()
}

fn hashing_engine(index: Arc<dyn VectorIndex>) -> RetrievalEngine {
    engine_with(Arc::new(HashingProvider::new(DIMENSION).unwrap()), index)
}

/// Provider that can be switched into failing, or that returns vectors of
/// the wrong length while advertising the right dimension.
struct ControlledProvider {
    inner: HashingProvider,
    failing: AtomicBool,
    wrong_dimension: bool,
}

impl ControlledProvider {
    fn new(wrong_dimension: bool) -> Self {
        Self {
            inner: HashingProvider::new(DIMENSION).unwrap(),
            failing: AtomicBool::new(false),
            wrong_dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ControlledProvider {
    fn name(&self) -> &str {
        "controlled"
    }

    fn model(&self) -> &str {
        "controlled-model"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> docrag_embeddings::Result<Embedding> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::ApiRequest {
                status: 503,
                message: "model unavailable".to_string(),
            });
        }
        if self.wrong_dimension {
            return Ok(vec![0.5; DIMENSION / 2]);
        }
        Ok(self.inner.vectorize(text))
    }
}

/// Provider that places text mentioning "far" at an enormous distance from
/// everything else.
struct FarProvider;

#[async_trait]
impl EmbeddingProvider for FarProvider {
    fn name(&self) -> &str {
        "far"
    }

    fn model(&self) -> &str {
        "far-model"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> docrag_embeddings::Result<Embedding> {
        let mut vector = vec![0.0; DIMENSION];
        if text.contains("far") {
            vector[0] = 1e20;
        }
        Ok(vector)
    }
}

/// Backend whose saves can be made to fail.
#[derive(Default)]
struct BrittleBackend {
    fail_save: AtomicBool,
}

#[async_trait]
impl CollectionBackend for BrittleBackend {
    async fn load(&self, _name: &str) -> docrag_vector_store::Result<Option<Collection>> {
        Ok(None)
    }

    async fn save(&self, _collection: &Collection) -> docrag_vector_store::Result<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(IndexError::Storage("volume detached".to_string()));
        }
        Ok(())
    }

    async fn destroy(&self, _name: &str) -> docrag_vector_store::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_unique_token_round_trip() {
    let engine = hashing_engine(store());
    let documents = [
        ("python.txt", "Senior Python engineer, Django and FastAPI, PostgreSQL tuning"),
        ("rust.txt", "Systems programmer writing Rust services with Tokio and gRPC"),
        ("design.txt", "Product designer focused on Figma prototypes and user research"),
        ("unique.txt", "Consultant holding the quasarflux certification"),
    ];
    for (doc_id, text) in documents {
        engine.ingest(doc_id, text).await.unwrap();
    }

    let results = engine.search("quasarflux", 4).await;
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].doc_id(), "unique.txt");
    assert!(results[0].score() > results[1].score());
    for pair in results.windows(2) {
        assert!(pair[0].score() >= pair[1].score());
    }
    for result in &results {
        assert!(result.score() > 0.0 && result.score() <= 1.0);
    }
}

#[tokio::test]
async fn test_n_results_larger_than_index() {
    let engine = hashing_engine(store());
    for doc_id in ["a.txt", "b.txt", "c.txt"] {
        engine
            .ingest(doc_id, &format!("short document {doc_id}"))
            .await
            .unwrap();
    }

    assert_eq!(engine.search("document", 5).await.len(), 3);
    assert_eq!(engine.search("document", 2).await.len(), 2);
}

#[tokio::test]
async fn test_repeated_phrase_document() {
    let index = store();
    let engine = hashing_engine(index.clone());
    let text = "alpha beta gamma ".repeat(150);

    let report = engine.ingest("phrases.txt", &text).await.unwrap();
    assert!(report.chunk_count >= 2);

    let entries = index.enumerate(None).await.unwrap();
    assert_eq!(entries.len(), report.chunk_count);
    for entry in &entries {
        assert!(!entry.text.trim().is_empty());
        assert_eq!(entry.metadata.total_chunks, report.chunk_count);
        assert_eq!(entry.metadata.doc_id, "phrases.txt");
    }
}

#[tokio::test]
async fn test_remove_unknown_document_is_noop() {
    let index = store();
    let engine = hashing_engine(index.clone());
    engine.ingest("a.txt", "some content").await.unwrap();

    assert_eq!(engine.remove("never-ingested.txt").await.unwrap(), 0);
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_clear_resets_state() {
    let index = store();
    let engine = hashing_engine(index.clone());
    let admin = CollectionAdmin::for_engine(&engine, StatsConfig::default());
    engine.ingest("a.txt", "first document").await.unwrap();
    engine.ingest("b.txt", "second document").await.unwrap();

    admin.clear().await.unwrap();

    assert_eq!(index.count().await.unwrap(), 0);
    assert!(engine.search("document", 5).await.is_empty());
    let stats = admin.stats().await.unwrap();
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.distinct_documents, 0);

    // The recreated collection accepts the same ids again.
    engine.ingest("a.txt", "first document").await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_provider_failure_is_distinguishable() {
    let index = store();
    let provider = Arc::new(ControlledProvider::new(false));
    let engine = engine_with(provider.clone(), index.clone());
    engine.ingest("a.txt", "healthy ingest").await.unwrap();

    provider.failing.store(true, Ordering::SeqCst);

    assert!(engine.search("healthy", 5).await.is_empty());
    assert!(matches!(
        engine.try_search("healthy", 5).await,
        Err(RetrievalError::Provider(_))
    ));
    assert!(matches!(
        engine.ingest("b.txt", "never stored").await,
        Err(RetrievalError::Provider(_))
    ));
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_wrong_dimension_vectors_leave_index_untouched() {
    let index = store();
    let engine = engine_with(Arc::new(ControlledProvider::new(true)), index.clone());

    let err = engine.ingest("a.txt", "some text").await.unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::Provider(EmbeddingError::DimensionMismatch {
            expected: DIMENSION,
            actual: 192
        })
    ));
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_recreate_surfaces_unavailable_collection() {
    let backend = Arc::new(BrittleBackend::default());
    let index = Arc::new(
        VectorStore::open(CollectionConfig::new("skillsheets", DIMENSION), backend.clone())
            .await
            .unwrap(),
    );
    let engine = hashing_engine(index.clone());
    let admin = CollectionAdmin::for_engine(&engine, StatsConfig::default());
    engine.ingest("a.txt", "content before clear").await.unwrap();

    backend.fail_save.store(true, Ordering::SeqCst);
    assert!(matches!(
        admin.clear().await,
        Err(RetrievalError::CollectionUnavailable(_))
    ));

    assert!(matches!(
        admin.stats().await,
        Err(RetrievalError::CollectionUnavailable(_))
    ));
    assert!(matches!(
        engine.ingest("b.txt", "after clear").await,
        Err(RetrievalError::CollectionUnavailable(_))
    ));
    assert!(matches!(
        engine.try_search("content", 3).await,
        Err(RetrievalError::CollectionUnavailable(_))
    ));
    assert!(engine.search("content", 3).await.is_empty());

    backend.fail_save.store(false, Ordering::SeqCst);
    admin.clear().await.unwrap();
    assert_eq!(admin.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_distant_entries_still_rank() {
    let engine = engine_with(Arc::new(FarProvider), store());
    engine.ingest("near.txt", "close neighbour").await.unwrap();
    engine.ingest("far.txt", "far away outlier").await.unwrap();

    let results = engine.try_search("query", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].doc_id(), "near.txt");
    assert_eq!(results[0].score(), 1.0);
    assert_eq!(results[1].doc_id(), "far.txt");
    assert!(results[1].score() > 0.0 && results[1].score() < 1.0);
    assert_eq!(engine.search("query", 2).await.len(), 2);
}

#[tokio::test]
async fn test_ingest_from_source_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Profile.TXT");
    std::fs::write(&path, "Data engineer experienced with Spark and Airflow").unwrap();

    let index = store();
    let engine = hashing_engine(index.clone());
    let registry = SourceRegistry::with_defaults();
    let document = Document::from_path(&path);

    let report = engine
        .ingest_from_source(&document, &registry)
        .await
        .unwrap();
    assert_eq!(report.doc_id, "Profile.TXT");

    let entries = index.enumerate(None).await.unwrap();
    assert_eq!(entries[0].metadata.source, path.display().to_string());

    let unsupported = Document::from_path(dir.path().join("scan.pdf"));
    assert!(matches!(
        engine.ingest_from_source(&unsupported, &registry).await,
        Err(RetrievalError::Extraction(_))
    ));
}

#[tokio::test]
async fn test_concurrent_ingests_of_distinct_documents() {
    let index = store();
    let engine = Arc::new(hashing_engine(index.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .ingest(&format!("doc-{i}.txt"), &format!("document number {i}"))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let admin = CollectionAdmin::for_engine(&engine, StatsConfig::default());
    let stats = admin.stats().await.unwrap();
    assert_eq!(stats.total_entries, 8);
    assert_eq!(stats.distinct_documents, 8);
}

#[tokio::test]
async fn test_persisted_collection_reopens_with_stats() {
    let dir = TempDir::new().unwrap();
    let config = docrag_retrieval::RetrievalConfig::new(dir.path());

    {
        let engine = RetrievalEngine::open(&config).await.unwrap();
        engine
            .ingest("a.txt", &"lorem ipsum dolor ".repeat(100))
            .await
            .unwrap();
    }

    let engine = RetrievalEngine::open(&config).await.unwrap();
    let admin = CollectionAdmin::for_engine(&engine, config.stats);
    let stats = admin.stats().await.unwrap();
    assert!(stats.per_document["a.txt"].chunk_count >= 2);
    assert_eq!(admin.info().await.unwrap().name, "skillsheets");
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_ingest_is_deterministic(text in "[a-z]{1,8}( [a-z]{1,8}){0,80}") {
            let (first, second) = tokio_test::block_on(async {
                let a = store();
                let b = store();
                hashing_engine(a.clone()).ingest("doc.txt", &text).await.unwrap();
                hashing_engine(b.clone()).ingest("doc.txt", &text).await.unwrap();
                (a.enumerate(None).await.unwrap(), b.enumerate(None).await.unwrap())
            });
            prop_assert_eq!(first, second);
        }
    }
}
