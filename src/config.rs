//! Indexer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Settings for one indexing run.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```
/// use tf_idf_indexer::IndexerConfig;
///
/// let config = IndexerConfig::from_toml_str("min_document_count = 2").unwrap();
/// assert_eq!(config.min_document_count, 2);
/// assert_eq!(config.positive_label, "huffpo");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    /// Terms must appear in strictly more documents than this to become a column.
    pub min_document_count: u64,
    /// Source label mapped to `1` in the label vector.
    pub positive_label: String,
    /// Whether documents with no tokens still count toward `total_documents`.
    pub count_empty_documents: bool,
    /// How many times a failed document write batch is retried before aborting.
    pub retry_limit: u32,
    /// Documents whose term frequencies are counted in parallel per step.
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            min_document_count: 16,
            positive_label: "huffpo".to_string(),
            count_empty_documents: true,
            retry_limit: 1,
            batch_size: 256,
        }
    }
}

impl IndexerConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, IndexError> {
        let config: Self = toml::from_str(text).map_err(|e| IndexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.batch_size == 0 {
            return Err(IndexError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}
