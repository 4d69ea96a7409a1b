//! The vector index interface consumed by the retrieval engine.

use async_trait::async_trait;

use crate::collection::CollectionInfo;
use crate::entry::{IndexEntry, MetadataFilter, QueryHit};
use crate::error::Result;

/// A collection of embedded chunks supporting exact nearest-neighbor search.
///
/// Batch operations are atomic: a reader observes either none or all of a
/// batch, and a rejected batch leaves the index untouched.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored and queried vector must have.
    fn dimension(&self) -> usize;

    /// Descriptive information about the collection.
    async fn info(&self) -> Result<CollectionInfo>;

    /// Insert a batch of entries.
    ///
    /// Fails with `DuplicateEntry` if any id already exists or repeats within
    /// the batch, and with `DimensionMismatch`/`InvalidVector` for bad
    /// vectors. On failure nothing from the batch is stored.
    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Remove every entry whose metadata matches `filter`. Returns the number
    /// removed, which may be zero.
    async fn delete(&self, filter: &MetadataFilter) -> Result<usize>;

    /// Remove the entries matching `filter` and insert `entries` in one step.
    ///
    /// Duplicate checks run after the removal, so a document can be replaced
    /// by a batch reusing its entry ids. Returns the number removed.
    async fn replace(&self, filter: &MetadataFilter, entries: Vec<IndexEntry>) -> Result<usize>;

    /// The `k` entries closest to `vector`, by ascending distance.
    ///
    /// Entries at equal distance keep their enumeration order.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    /// Entries in insertion order, at most `limit` of them when given.
    async fn enumerate(&self, limit: Option<usize>) -> Result<Vec<IndexEntry>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;

    /// Destroy every entry and recreate an empty collection with the same
    /// name and description.
    async fn drop_and_recreate(&self) -> Result<()>;
}
