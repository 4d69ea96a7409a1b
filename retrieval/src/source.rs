//! Text extraction from source documents.
//!
//! The engine only ever sees plain text. A [`TextSource`] turns a document
//! reference into that text; the [`SourceRegistry`] picks a source by file
//! extension.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SourceError;

type Result<T> = std::result::Result<T, SourceError>;

/// A document known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-assigned identifier, typically the file name.
    pub doc_id: String,

    /// Reference to the source artifact (path, URL, ...).
    pub source: String,
}

impl Document {
    pub fn new(doc_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            source: source.into(),
        }
    }

    /// A document identified by its file name, sourced from `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let doc_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(doc_id, path.display().to_string())
    }

    /// The source reference as a filesystem path.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.source)
    }
}

/// Extracts plain text from a document.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Lowercase file extensions (without the dot) this source handles.
    fn extensions(&self) -> &[&str];

    /// Read `path` and return its text content.
    async fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Reads text-like files as UTF-8, replacing invalid sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextSource;

const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "tsv", "json", "log"];

#[async_trait]
impl TextSource for PlainTextSource {
    fn name(&self) -> &str {
        "plain-text"
    }

    fn extensions(&self) -> &[&str] {
        PLAIN_TEXT_EXTENSIONS
    }

    async fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await.map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Dispatches extraction to a registered source by file extension.
///
/// Extensions match case-insensitively. A later registration for the same
/// extension replaces the earlier one.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn TextSource>>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in sources.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlainTextSource));
        registry
    }

    /// Register `source` for every extension it declares.
    pub fn register(&mut self, source: Arc<dyn TextSource>) {
        for ext in source.extensions() {
            self.sources
                .insert(ext.to_ascii_lowercase(), Arc::clone(&source));
        }
    }

    /// The source responsible for `path`, if any.
    pub fn source_for(&self, path: &Path) -> Option<&Arc<dyn TextSource>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.sources.get(&ext)
    }

    /// Whether some registered source handles `path`.
    pub fn supports(&self, path: &Path) -> bool {
        self.source_for(path).is_some()
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

#[async_trait]
impl TextSource for SourceRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    fn extensions(&self) -> &[&str] {
        &[]
    }

    async fn extract_text(&self, path: &Path) -> Result<String> {
        let source = self.source_for(path).ok_or_else(|| {
            SourceError::UnsupportedFormat(
                path.extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            )
        })?;
        debug!("Extracting {} with {}", path.display(), source.name());
        source.extract_text(path).await
    }
}
