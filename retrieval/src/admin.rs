//! Collection-wide lifecycle operations and statistics.

use std::collections::BTreeMap;
use std::sync::Arc;

use docrag_vector_store::{CollectionInfo, VectorIndex};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::StatsConfig;
use crate::engine::RetrievalEngine;
use crate::error::Result;

/// Aggregate statistics over the collection.
///
/// Per-document figures are computed from at most `scanned_entries` entries.
/// When the scan limit is below the collection size, `truncated` is set and
/// `distinct_documents` and `per_document` only describe the scanned part;
/// `total_entries` is always exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub total_entries: usize,
    pub distinct_documents: usize,
    pub per_document: BTreeMap<String, DocumentStats>,
    pub scanned_entries: usize,
    pub truncated: bool,
}

/// Statistics for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    /// Number of indexed chunks.
    pub chunk_count: usize,

    /// Sum of the chunk text lengths, in characters.
    pub total_text_size: usize,
}

/// Administrative operations over the whole collection.
pub struct CollectionAdmin {
    index: Arc<dyn VectorIndex>,
    stats: StatsConfig,
}

impl CollectionAdmin {
    pub fn new(index: Arc<dyn VectorIndex>, stats: StatsConfig) -> Self {
        Self { index, stats }
    }

    /// An administrator over the index `engine` writes to.
    pub fn for_engine(engine: &RetrievalEngine, stats: StatsConfig) -> Self {
        Self::new(Arc::clone(engine.index()), stats)
    }

    /// Aggregate entry counts per document.
    pub async fn stats(&self) -> Result<CollectionStats> {
        let count = self.index.count().await?;
        let entries = self.index.enumerate(self.stats.effective_limit()).await?;

        let mut per_document: BTreeMap<String, DocumentStats> = BTreeMap::new();
        for entry in &entries {
            let doc = per_document.entry(entry.metadata.doc_id.clone()).or_default();
            doc.chunk_count += 1;
            doc.total_text_size += entry.text.chars().count();
        }

        let scanned_entries = entries.len();
        // A concurrent insert may land between the two reads.
        let total_entries = count.max(scanned_entries);
        let stats = CollectionStats {
            total_entries,
            distinct_documents: per_document.len(),
            per_document,
            scanned_entries,
            truncated: scanned_entries < total_entries,
        };

        debug!(
            "Collection stats: {} entries, {} documents{}",
            stats.total_entries,
            stats.distinct_documents,
            if stats.truncated { " (truncated scan)" } else { "" }
        );
        Ok(stats)
    }

    /// Remove every entry and recreate the empty collection.
    pub async fn clear(&self) -> Result<()> {
        self.index.drop_and_recreate().await?;
        info!("Cleared collection");
        Ok(())
    }

    /// Name, description, metric, dimension and creation time.
    pub async fn info(&self) -> Result<CollectionInfo> {
        self.index.info().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrag_vector_store::{CollectionConfig, EntryMetadata, IndexEntry, VectorStore};
    use pretty_assertions::assert_eq;

    fn entry(doc_id: &str, chunk_index: usize, text: &str) -> IndexEntry {
        IndexEntry::for_chunk(
            vec![chunk_index as f32, 1.0],
            text,
            EntryMetadata {
                doc_id: doc_id.to_string(),
                chunk_index,
                total_chunks: 1,
                source: doc_id.to_string(),
                chunk_size: text.chars().count(),
            },
        )
    }

    async fn admin_with(entries: Vec<IndexEntry>, stats: StatsConfig) -> CollectionAdmin {
        let store = VectorStore::in_memory(CollectionConfig::new("test", 2)).unwrap();
        store.insert(entries).await.unwrap();
        CollectionAdmin::new(Arc::new(store), stats)
    }

    #[tokio::test]
    async fn test_stats_aggregate_per_document() {
        let admin = admin_with(
            vec![
                entry("a.xlsx", 0, "hello"),
                entry("b.pdf", 0, "日本語"),
                entry("a.xlsx", 1, "world!"),
            ],
            StatsConfig::default(),
        )
        .await;

        let stats = admin.stats().await.unwrap();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.distinct_documents, 2);
        assert_eq!(stats.scanned_entries, 3);
        assert!(!stats.truncated);
        assert_eq!(
            stats.per_document["a.xlsx"],
            DocumentStats {
                chunk_count: 2,
                total_text_size: 11
            }
        );
        assert_eq!(
            stats.per_document["b.pdf"],
            DocumentStats {
                chunk_count: 1,
                total_text_size: 3
            }
        );
    }

    #[tokio::test]
    async fn test_stats_scan_limit_marks_truncation() {
        let entries: Vec<IndexEntry> = (0..5).map(|i| entry(&format!("doc{i}"), 0, "x")).collect();
        let limited = StatsConfig {
            scan_limit: 2,
            full_scan: false,
        };

        let admin = admin_with(entries.clone(), limited).await;
        let stats = admin.stats().await.unwrap();
        assert_eq!(stats.total_entries, 5);
        assert_eq!(stats.scanned_entries, 2);
        assert_eq!(stats.distinct_documents, 2);
        assert!(stats.truncated);

        let full = StatsConfig {
            scan_limit: 2,
            full_scan: true,
        };
        let admin = admin_with(entries, full).await;
        let stats = admin.stats().await.unwrap();
        assert_eq!(stats.distinct_documents, 5);
        assert!(!stats.truncated);
    }

    #[tokio::test]
    async fn test_empty_collection_stats() {
        let admin = admin_with(Vec::new(), StatsConfig::default()).await;
        let stats = admin.stats().await.unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.distinct_documents, 0);
        assert!(stats.per_document.is_empty());
        assert!(!stats.truncated);
    }

    #[tokio::test]
    async fn test_clear_and_info() {
        let admin = admin_with(vec![entry("a", 0, "text")], StatsConfig::default()).await;
        admin.clear().await.unwrap();

        assert_eq!(admin.stats().await.unwrap().total_entries, 0);
        let info = admin.info().await.unwrap();
        assert_eq!(info.name, "test");
        assert_eq!(info.dimension, 2);
    }
}
