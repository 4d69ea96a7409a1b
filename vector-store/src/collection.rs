//! Collection configuration and in-memory representation.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::entry::IndexEntry;
use crate::error::{IndexError, Result};

/// Settings a collection is created (and recreated) with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Collection name. Also used as the file stem on disk.
    pub name: String,

    /// Free-form description stored with the collection.
    pub description: String,

    /// Dimension every vector must have.
    pub dimension: usize,

    /// Metric used by queries.
    pub metric: DistanceMetric,
}

impl CollectionConfig {
    /// Create a new configuration with an empty description and L2 metric.
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            dimension,
            metric: DistanceMetric::default(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Reject names that are not safe file stems and zero dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || self.name.starts_with('.')
        {
            return Err(IndexError::InvalidConfig(format!(
                "collection name {:?} must be non-empty and use only [A-Za-z0-9._-]",
                self.name
            )));
        }
        if self.dimension == 0 {
            return Err(IndexError::InvalidConfig(
                "collection dimension must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Descriptive information about a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub description: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub created_at: DateTime<Utc>,
}

/// A collection of index entries, kept in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    info: CollectionInfo,
    entries: IndexMap<String, IndexEntry>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(config: &CollectionConfig) -> Self {
        Self {
            info: CollectionInfo {
                name: config.name.clone(),
                description: config.description.clone(),
                dimension: config.dimension,
                metric: config.metric,
                created_at: Utc::now(),
            },
            entries: IndexMap::new(),
        }
    }

    pub fn info(&self) -> &CollectionInfo {
        &self.info
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub(crate) fn push(&mut self, entry: IndexEntry) -> Result<()> {
        if self.entries.contains_key(&entry.id) {
            return Err(IndexError::DuplicateEntry(entry.id));
        }
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Remove entries matching `predicate`, keeping the order of the rest.
    pub(crate) fn remove_where(&mut self, predicate: impl Fn(&IndexEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !predicate(entry));
        before - self.entries.len()
    }

    /// Check a collection read back from storage against the expected config.
    pub(crate) fn check_compatible(&self, config: &CollectionConfig) -> Result<()> {
        if self.info.name != config.name {
            return Err(IndexError::Storage(format!(
                "stored collection is named {:?}, expected {:?}",
                self.info.name, config.name
            )));
        }
        if self.info.dimension != config.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: config.dimension,
                actual: self.info.dimension,
            });
        }
        for (id, entry) in &self.entries {
            if *id != entry.id {
                return Err(IndexError::Storage(format!(
                    "entry stored under {id:?} carries id {:?}",
                    entry.id
                )));
            }
            entry.validate(self.info.dimension)?;
        }
        Ok(())
    }
}
