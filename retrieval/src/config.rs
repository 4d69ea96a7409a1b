//! Configuration for the retrieval engine.

use std::path::{Path, PathBuf};

use docrag_embeddings::DEFAULT_DIMENSION;
use docrag_vector_store::{CollectionConfig, DistanceMetric};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunker::Chunker;
use crate::error::{Result, RetrievalError};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// Default number of entries scanned when computing statistics.
pub const DEFAULT_SCAN_LIMIT: usize = 1000;

/// Environment variable overriding `collection.data_dir`.
pub const DATA_DIR_ENV_VAR: &str = "DOCRAG_DATA_DIR";

/// Environment variable overriding `embedding.api_key`.
pub const API_KEY_ENV_VAR: &str = "DOCRAG_EMBEDDING_API_KEY";

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// How documents are split into chunks.
    pub chunking: ChunkingConfig,

    /// Search defaults.
    pub search: SearchConfig,

    /// Statistics scan settings.
    pub stats: StatsConfig,

    /// Where and how the collection is stored.
    pub collection: CollectionSettings,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,
}

impl RetrievalConfig {
    /// Create a configuration with defaults, storing data under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::default().with_data_dir(data_dir)
    }

    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docrag").join("config.toml"))
    }

    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RetrievalError::Configuration(format!("invalid config: {e}")))
    }

    /// Load, apply environment overrides and validate the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, otherwise the default file if it exists,
    /// otherwise built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Apply `DOCRAG_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_ENV_VAR).filter(|v| !v.is_empty()) {
            self.collection.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup(API_KEY_ENV_VAR).filter(|v| !v.is_empty()) {
            self.embedding.api_key = Some(key);
        }
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        Chunker::new(self.chunking.chunk_size, self.chunking.overlap)?;
        if self.search.default_results == 0 {
            return Err(RetrievalError::Configuration(
                "search.default_results must be greater than zero".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(RetrievalError::Configuration(
                "embedding.dimension must be greater than zero".to_string(),
            ));
        }
        self.collection_config()
            .validate()
            .map_err(|e| RetrievalError::Configuration(e.to_string()))
    }

    /// Collection settings in the form the vector store expects.
    pub fn collection_config(&self) -> CollectionConfig {
        CollectionConfig::new(&self.collection.name, self.embedding.dimension)
            .with_description(&self.collection.description)
            .with_metric(self.collection.metric)
    }

    /// Store data under `dir`.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.collection.data_dir = dir.into();
        self
    }

    /// Set the chunking configuration.
    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunking = ChunkingConfig {
            chunk_size,
            overlap,
        };
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the statistics configuration.
    pub fn with_stats(mut self, config: StatsConfig) -> Self {
        self.stats = config;
        self
    }
}

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Search defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results returned when the caller does not ask for a count.
    pub default_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_results: 10,
        }
    }
}

/// Statistics scan settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Maximum number of entries read when aggregating statistics.
    pub scan_limit: usize,

    /// Read every entry, ignoring `scan_limit`.
    pub full_scan: bool,
}

impl StatsConfig {
    /// The enumeration limit to apply, `None` for a full scan.
    pub fn effective_limit(&self) -> Option<usize> {
        if self.full_scan {
            None
        } else {
            Some(self.scan_limit)
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            scan_limit: DEFAULT_SCAN_LIMIT,
            full_scan: false,
        }
    }
}

/// Collection identity and storage location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub name: String,
    pub description: String,

    /// Directory holding the persisted collection.
    pub data_dir: PathBuf,

    pub metric: DistanceMetric,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            name: "skillsheets".to_string(),
            description: "Skill sheet chunks for retrieval".to_string(),
            data_dir: dirs::data_dir().unwrap_or_default().join("docrag"),
            metric: DistanceMetric::default(),
        }
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model name. Providers fall back to their own default when unset.
    pub model: Option<String>,

    /// Vector dimension. Must match the stored collection.
    pub dimension: usize,

    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: Option<String>,

    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Additional attempts for transient provider failures.
    pub max_retries: usize,

    /// Upper bound on the delay between two attempts, in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Hashing,
            model: None,
            dimension: DEFAULT_DIMENSION,
            base_url: None,
            api_key: None,
            max_retries: 3,
            retry_max_delay_ms: 10_000,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Deterministic offline feature hashing.
    #[default]
    Hashing,
    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAi,
}
