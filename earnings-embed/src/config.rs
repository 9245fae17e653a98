//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default embedding model, a small general-purpose sentence encoder.
pub const DEFAULT_MODEL_NAME: &str = "all-minilm-l6-v2";

/// Configuration for embedding models.
///
/// Query and document embeddings are only comparable when produced by the
/// same model, so the same `EmbedConfig` must be used at ingestion and query
/// time. The config serializes deterministically, which is what the provider
/// cache keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Name of the embedding model to use
    pub model_name: String,
    /// Directory where downloaded model files are cached
    pub cache_dir: PathBuf,
    /// Maximum batch size for embedding generation
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    pub normalize: bool,
}

impl EmbedConfig {
    /// Create a new embedding configuration.
    pub fn new<P: AsRef<Path>>(cache_dir: P, model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            cache_dir: cache_dir.as_ref().to_path_buf(),
            batch_size: 32,
            normalize: true,
        }
    }

    /// Create a default configuration with the given cache directory.
    pub fn default_with_path<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self::new(cache_dir, DEFAULT_MODEL_NAME)
    }

    /// Set the maximum batch size for embedding generation.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set whether embeddings are L2-normalized.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Get the model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Resolve the configured model name to a fastembed model.
    ///
    /// Only a small set of known-good sentence encoders is supported; an
    /// unknown name is a configuration error, surfaced before any model
    /// download is attempted.
    pub fn fastembed_model(&self) -> Result<EmbeddingModel> {
        match self.model_name.as_str() {
            "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            other => Err(EmbedError::invalid_config(format!(
                "unknown embedding model: {other}"
            ))),
        }
    }
}
