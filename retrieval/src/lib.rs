//! # Retrieval Engine
//!
//! This crate turns documents into searchable chunks and answers similarity
//! queries over them:
//!
//! - **Chunker**: boundary-aware, overlapping text windows
//! - **Engine**: chunk, embed and index on ingest; embed, query and score on
//!   search
//! - **Admin**: statistics, clearing and collection info
//! - **Sources**: plain-text extraction dispatched by file extension
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   extract_text   ┌──────────────────────────┐
//! │ SourceRegistry │ ───────────────▶ │     RetrievalEngine      │
//! └────────────────┘                  │  Chunker ─▶ embed_batch  │
//!                                     │  query ─▶ score ─▶ rank  │
//!                                     └─────┬──────────────┬─────┘
//!                                           │              │
//!                          Arc<dyn EmbeddingProvider>   Arc<dyn VectorIndex>
//!                                                          ▲
//!                                     ┌────────────────────┘
//!                                     │
//!                              ┌──────┴──────────┐
//!                              │ CollectionAdmin │  stats / clear / info
//!                              └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrag_retrieval::{CollectionAdmin, RetrievalConfig, RetrievalEngine};
//!
//! let config = RetrievalConfig::load_or_default(None)?;
//! let engine = RetrievalEngine::open(&config).await?;
//!
//! engine.ingest("resume.xlsx", &extracted_text).await?;
//! let results = engine.search("Rust and Kubernetes experience", 5).await;
//!
//! let admin = CollectionAdmin::for_engine(&engine, config.stats);
//! println!("{} entries", admin.stats().await?.total_entries);
//! ```

pub mod admin;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod error;
pub mod result;
pub mod source;

pub use admin::{CollectionAdmin, CollectionStats, DocumentStats};
pub use chunker::{Chunk, Chunker};
pub use config::RetrievalConfig;
pub use engine::{IngestReport, RetrievalEngine, RetrievalEngineBuilder};
pub use error::{Result, RetrievalError, SourceError};
pub use result::{SearchResult, distance_to_score};
pub use source::{Document, PlainTextSource, SourceRegistry, TextSource};

// Re-export from dependencies for convenience
pub use docrag_embeddings::{EmbeddingProvider, HashingProvider};
pub use docrag_vector_store::{CollectionInfo, EntryMetadata, VectorIndex, VectorStore};
