//! Copy-then-swap implementation of [`VectorIndex`].
//!
//! The published state is an immutable `Arc<Collection>`. Writers take the
//! writer lock, clone the published collection, apply their change to the
//! clone, persist it through the backend and only then publish it. Readers
//! grab the current `Arc` and work on it without holding any lock, so they
//! never see a half-applied batch.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ordered_float::OrderedFloat;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::backend::{CollectionBackend, JsonFileBackend, MemoryBackend};
use crate::collection::{Collection, CollectionConfig, CollectionInfo};
use crate::entry::{IndexEntry, MetadataFilter, QueryHit};
use crate::error::{IndexError, Result};
use crate::index::VectorIndex;

/// What readers currently see.
#[derive(Debug, Clone)]
enum Snapshot {
    Ready(Arc<Collection>),
    /// The collection was destroyed and could not be recreated.
    Unavailable(String),
}

/// A single collection backed by a [`CollectionBackend`].
pub struct VectorStore {
    config: CollectionConfig,
    backend: Arc<dyn CollectionBackend>,
    snapshot: RwLock<Snapshot>,
    writer: Mutex<()>,
}

impl VectorStore {
    /// Create a store that keeps the collection in memory only.
    pub fn in_memory(config: CollectionConfig) -> Result<Self> {
        config.validate()?;
        let collection = Collection::new(&config);
        Ok(Self {
            config,
            backend: Arc::new(MemoryBackend),
            snapshot: RwLock::new(Snapshot::Ready(Arc::new(collection))),
            writer: Mutex::new(()),
        })
    }

    /// Open the collection named in `config`, creating it if the backend has
    /// nothing stored under that name.
    ///
    /// An existing collection keeps its stored description and metric; its
    /// dimension must match `config`.
    pub async fn open(config: CollectionConfig, backend: Arc<dyn CollectionBackend>) -> Result<Self> {
        config.validate()?;

        let (config, collection) = match backend.load(&config.name).await? {
            Some(stored) => {
                stored.check_compatible(&config)?;
                let stored_info = stored.info();
                if stored_info.metric != config.metric {
                    warn!(
                        "Collection {} was created with {:?} distance; ignoring configured {:?}",
                        config.name, stored_info.metric, config.metric
                    );
                }
                let config = CollectionConfig {
                    name: stored_info.name.clone(),
                    description: stored_info.description.clone(),
                    dimension: stored_info.dimension,
                    metric: stored_info.metric,
                };
                info!(
                    "Opened collection {} with {} entries",
                    config.name,
                    stored.len()
                );
                (config, stored)
            }
            None => {
                let collection = Collection::new(&config);
                backend.save(&collection).await?;
                info!(
                    "Created collection {} (dimension {}, {:?})",
                    config.name, config.dimension, config.metric
                );
                (config, collection)
            }
        };

        Ok(Self {
            config,
            backend,
            snapshot: RwLock::new(Snapshot::Ready(Arc::new(collection))),
            writer: Mutex::new(()),
        })
    }

    /// Open a collection stored as JSON under `dir`.
    pub async fn open_dir(config: CollectionConfig, dir: impl AsRef<Path>) -> Result<Self> {
        let backend = JsonFileBackend::new(dir).await?;
        Self::open(config, Arc::new(backend)).await
    }

    /// Configuration the collection is (re)created with.
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Whether the collection can currently serve requests.
    pub async fn is_available(&self) -> bool {
        matches!(*self.snapshot.read().await, Snapshot::Ready(_))
    }

    async fn current(&self) -> Result<Arc<Collection>> {
        match &*self.snapshot.read().await {
            Snapshot::Ready(collection) => Ok(Arc::clone(collection)),
            Snapshot::Unavailable(reason) => Err(IndexError::CollectionUnavailable(reason.clone())),
        }
    }

    /// Apply `mutate` to a copy of the collection, persist it and publish it.
    async fn commit<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Collection) -> Result<T> + Send,
        T: Send,
    {
        let _guard = self.writer.lock().await;
        let current = self.current().await?;

        let mut next = Collection::clone(&current);
        let outcome = mutate(&mut next)?;

        self.backend.save(&next).await?;
        *self.snapshot.write().await = Snapshot::Ready(Arc::new(next));
        Ok(outcome)
    }

    fn check_query(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::InvalidVector("query".to_string()));
        }
        Ok(())
    }
}

fn push_all(collection: &mut Collection, entries: Vec<IndexEntry>) -> Result<()> {
    let dimension = collection.info().dimension;
    for entry in entries {
        entry.validate(dimension)?;
        collection.push(entry)?;
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for VectorStore {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn info(&self) -> Result<CollectionInfo> {
        Ok(self.current().await?.info().clone())
    }

    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let batch = entries.len();
        self.commit(move |collection| push_all(collection, entries))
            .await?;
        debug!("Inserted {batch} entries into {}", self.config.name);
        Ok(())
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<usize> {
        let current = self.current().await?;
        if !current.entries().any(|e| filter.matches(&e.metadata)) {
            return Ok(0);
        }

        let removed = self
            .commit(|collection| Ok(collection.remove_where(|e| filter.matches(&e.metadata))))
            .await?;
        debug!("Deleted {removed} entries matching {filter:?}");
        Ok(removed)
    }

    async fn replace(&self, filter: &MetadataFilter, entries: Vec<IndexEntry>) -> Result<usize> {
        let removed = self
            .commit(move |collection| {
                let removed = collection.remove_where(|e| filter.matches(&e.metadata));
                push_all(collection, entries)?;
                Ok(removed)
            })
            .await?;
        debug!("Replaced {removed} entries matching {filter:?}");
        Ok(removed)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        self.check_query(vector)?;
        let collection = self.current().await?;
        if k == 0 || collection.is_empty() {
            return Ok(Vec::new());
        }

        let metric = collection.info().metric;
        let mut scored: Vec<(OrderedFloat<f32>, &IndexEntry)> = collection
            .entries()
            .map(|entry| (OrderedFloat(metric.distance(vector, &entry.vector)), entry))
            .collect();
        // Stable sort: equal distances keep enumeration order.
        scored.sort_by_key(|(distance, _)| *distance);

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, entry)| QueryHit {
                entry: entry.clone(),
                distance: distance.into_inner(),
            })
            .collect())
    }

    async fn enumerate(&self, limit: Option<usize>) -> Result<Vec<IndexEntry>> {
        let collection = self.current().await?;
        let limit = limit.unwrap_or(usize::MAX);
        Ok(collection.entries().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.current().await?.len())
    }

    async fn drop_and_recreate(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        let name = &self.config.name;

        // Nothing has changed yet if this fails.
        self.backend.destroy(name).await?;
        info!("Destroyed collection {name}");

        let fresh = Collection::new(&self.config);
        match self.backend.save(&fresh).await {
            Ok(()) => {
                *self.snapshot.write().await = Snapshot::Ready(Arc::new(fresh));
                info!("Recreated empty collection {name}");
                Ok(())
            }
            Err(e) => {
                let reason = format!("collection {name} was destroyed but not recreated: {e}");
                error!("{reason}");
                *self.snapshot.write().await = Snapshot::Unavailable(reason.clone());
                Err(IndexError::CollectionUnavailable(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMetric;
    use crate::entry::EntryMetadata;
    use pretty_assertions::assert_eq;

    fn entry(doc_id: &str, chunk_index: usize, vector: Vec<f32>) -> IndexEntry {
        IndexEntry::for_chunk(
            vector,
            format!("{doc_id} chunk {chunk_index}"),
            EntryMetadata {
                doc_id: doc_id.to_string(),
                chunk_index,
                total_chunks: 1,
                source: format!("files/{doc_id}"),
                chunk_size: 10,
            },
        )
    }

    fn store() -> VectorStore {
        VectorStore::in_memory(CollectionConfig::new("test", 2).with_description("Test")).unwrap()
    }

    fn ids(entries: &[IndexEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = store();
        assert_eq!(store.count().await.unwrap(), 0);

        store
            .insert(vec![entry("a", 0, vec![0.0, 1.0]), entry("a", 1, vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_whole_batch_on_duplicate() {
        let store = store();
        store.insert(vec![entry("a", 0, vec![0.0, 1.0])]).await.unwrap();

        let err = store
            .insert(vec![entry("b", 0, vec![1.0, 1.0]), entry("a", 0, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DuplicateEntry(id) if id == "a_chunk_0"));
        assert_eq!(ids(&store.enumerate(None).await.unwrap()), vec!["a_chunk_0"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_within_batch() {
        let store = store();
        let err = store
            .insert(vec![entry("a", 0, vec![0.0, 1.0]), entry("a", 0, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DuplicateEntry(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_wrong_dimension() {
        let store = store();
        let err = store
            .insert(vec![entry("a", 0, vec![0.0, 1.0]), entry("a", 1, vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = store();
        store
            .insert(vec![
                entry("far", 0, vec![10.0, 10.0]),
                entry("near", 0, vec![1.0, 1.0]),
                entry("mid", 0, vec![3.0, 3.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 1.0], 2).await.unwrap();
        let got: Vec<&str> = hits.iter().map(|h| h.entry.metadata.doc_id.as_str()).collect();
        assert_eq!(got, vec!["near", "mid"]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, 8.0);
    }

    #[tokio::test]
    async fn test_query_ties_keep_insertion_order() {
        let store = store();
        store
            .insert(vec![
                entry("x", 0, vec![0.0, 1.0]),
                entry("y", 0, vec![1.0, 0.0]),
                entry("z", 0, vec![0.0, -1.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[0.0, 0.0], 3).await.unwrap();
        let got: Vec<&str> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(got, vec!["x_chunk_0", "y_chunk_0", "z_chunk_0"]);
    }

    #[tokio::test]
    async fn test_query_edge_cases() {
        let store = store();
        assert!(store.query(&[0.0, 0.0], 5).await.unwrap().is_empty());

        store.insert(vec![entry("a", 0, vec![0.0, 1.0])]).await.unwrap();
        assert!(store.query(&[0.0, 0.0], 0).await.unwrap().is_empty());
        assert_eq!(store.query(&[0.0, 0.0], 5).await.unwrap().len(), 1);
        assert!(store.query(&[0.0, 0.0, 0.0], 5).await.is_err());
        assert!(store.query(&[f32::INFINITY, 0.0], 5).await.is_err());
    }

    #[tokio::test]
    async fn test_cosine_metric() {
        let store = VectorStore::in_memory(
            CollectionConfig::new("cos", 2).with_metric(DistanceMetric::Cosine),
        )
        .unwrap();
        store
            .insert(vec![entry("long", 0, vec![10.0, 0.0]), entry("diag", 0, vec![1.0, 1.0])])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].entry.metadata.doc_id, "long");
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_delete_by_doc_id() {
        let store = store();
        store
            .insert(vec![
                entry("a", 0, vec![0.0, 1.0]),
                entry("b", 0, vec![1.0, 0.0]),
                entry("a", 1, vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let removed = store
            .delete(&MetadataFilter::DocId("a".to_string()))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(ids(&store.enumerate(None).await.unwrap()), vec!["b_chunk_0"]);

        let removed = store
            .delete(&MetadataFilter::DocId("missing".to_string()))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_reuses_ids() {
        let store = store();
        store
            .insert(vec![entry("a", 0, vec![0.0, 1.0]), entry("a", 1, vec![1.0, 0.0])])
            .await
            .unwrap();

        let removed = store
            .replace(
                &MetadataFilter::DocId("a".to_string()),
                vec![entry("a", 0, vec![2.0, 2.0])],
            )
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let entries = store.enumerate(None).await.unwrap();
        assert_eq!(ids(&entries), vec!["a_chunk_0"]);
        assert_eq!(entries[0].vector, vec![2.0, 2.0]);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_old_entries() {
        let store = store();
        store.insert(vec![entry("a", 0, vec![0.0, 1.0])]).await.unwrap();

        let result = store
            .replace(
                &MetadataFilter::DocId("a".to_string()),
                vec![entry("a", 0, vec![1.0])],
            )
            .await;
        assert!(result.is_err());
        assert_eq!(store.enumerate(None).await.unwrap()[0].vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_enumerate_limit_and_order() {
        let store = store();
        store
            .insert((0..5).map(|i| entry("a", i, vec![i as f32, 0.0])).collect())
            .await
            .unwrap();

        let first = store.enumerate(Some(3)).await.unwrap();
        assert_eq!(ids(&first), vec!["a_chunk_0", "a_chunk_1", "a_chunk_2"]);
        assert_eq!(first, store.enumerate(Some(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_and_recreate_keeps_description() {
        let store = store();
        store.insert(vec![entry("a", 0, vec![0.0, 1.0])]).await.unwrap();

        store.drop_and_recreate().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        let info = store.info().await.unwrap();
        assert_eq!(info.name, "test");
        assert_eq!(info.description, "Test");
        assert!(store.is_available().await);
    }

    #[tokio::test]
    async fn test_in_memory_rejects_invalid_config() {
        assert!(VectorStore::in_memory(CollectionConfig::new("bad name", 2)).is_err());
        assert!(VectorStore::in_memory(CollectionConfig::new("ok", 0)).is_err());
    }
}
