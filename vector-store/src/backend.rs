//! Durable storage for collections.
//!
//! A backend persists whole collections. The store hands it a complete
//! snapshot after every mutation, so a backend only has to make each
//! `save` atomic for the collection as a whole.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::collection::Collection;
use crate::error::{IndexError, Result};

/// Persistence layer behind a [`VectorStore`](crate::VectorStore).
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Load a collection, or `None` when nothing is stored under `name`.
    async fn load(&self, name: &str) -> Result<Option<Collection>>;

    /// Persist the full state of a collection, replacing any previous state.
    async fn save(&self, collection: &Collection) -> Result<()>;

    /// Remove a stored collection. Removing a missing collection succeeds.
    async fn destroy(&self, name: &str) -> Result<()>;
}

/// Backend that keeps nothing. Collections live only as long as the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

#[async_trait]
impl CollectionBackend for MemoryBackend {
    async fn load(&self, _name: &str) -> Result<Option<Collection>> {
        Ok(None)
    }

    async fn save(&self, _collection: &Collection) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// Stores each collection as a JSON document in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    root: PathBuf,
}

impl JsonFileBackend {
    /// Create a backend rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            IndexError::Storage(format!("failed to create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    /// Directory the collections are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding collection `name`.
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.collection.json"))
    }
}

#[async_trait]
impl CollectionBackend for JsonFileBackend {
    async fn load(&self, name: &str) -> Result<Option<Collection>> {
        let path = self.collection_path(name);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(IndexError::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let collection: Collection = serde_json::from_str(&content)?;
        debug!(
            "Loaded collection {name} ({} entries) from {}",
            collection.len(),
            path.display()
        );
        Ok(Some(collection))
    }

    async fn save(&self, collection: &Collection) -> Result<()> {
        let path = self.collection_path(&collection.info().name);
        let content = serde_json::to_vec(collection)?;

        // Write to a sibling temp file, then rename over the target.
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await.map_err(|e| {
            IndexError::Storage(format!("failed to write {}: {e}", temp_path.display()))
        })?;
        fs::rename(&temp_path, &path).await.map_err(|e| {
            IndexError::Storage(format!("failed to replace {}: {e}", path.display()))
        })?;

        debug!(
            "Saved collection {} ({} entries)",
            collection.info().name,
            collection.len()
        );
        Ok(())
    }

    async fn destroy(&self, name: &str) -> Result<()> {
        let path = self.collection_path(name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed collection file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IndexError::Storage(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}
