//! Persistent vector collection with exact nearest-neighbor search.
//!
//! This crate stores embedded text chunks together with their metadata and
//! answers k-nearest-neighbor queries by brute force.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐
//! │   dyn VectorIndex      │  insert / delete / replace / query
//! └───────────┬────────────┘  enumerate / count / drop_and_recreate
//!             │
//! ┌───────────▼────────────┐
//! │      VectorStore       │  writer lock + published Arc<Collection>
//! └───────────┬────────────┘
//!             │ save / load / destroy
//! ┌───────────▼────────────┐
//! │ dyn CollectionBackend  │  JsonFileBackend, MemoryBackend
//! └────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docrag_vector_store::{CollectionConfig, VectorIndex, VectorStore};
//!
//! let store = VectorStore::open_dir(CollectionConfig::new("docs", 384), "data").await?;
//! let hits = store.query(&query_vector, 5).await?;
//! ```

pub mod backend;
pub mod collection;
pub mod distance;
pub mod entry;
pub mod error;
pub mod index;
pub mod store;

pub use backend::{CollectionBackend, JsonFileBackend, MemoryBackend};
pub use collection::{Collection, CollectionConfig, CollectionInfo};
pub use distance::DistanceMetric;
pub use entry::{EntryMetadata, IndexEntry, MetadataFilter, QueryHit};
pub use error::{IndexError, Result};
pub use index::VectorIndex;
pub use store::VectorStore;
