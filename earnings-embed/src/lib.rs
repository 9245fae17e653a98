//! # earnings-embed
//!
//! Text embedding for the earnings-call retrieval pipeline, built on local
//! ONNX models via FastEmbed. The crate exposes a small async abstraction so
//! the rest of the system treats embedding as an opaque text-to-vector
//! collaborator that can be swapped for a test double.
//!
//! ## Features
//!
//! - **Local ONNX Models**: embeddings are computed locally, no external API
//! - **Async-First Design**: model loading and inference run on blocking
//!   threads behind async entry points
//! - **Model Caching**: initialized models are cached process-wide so
//!   ingestion and query paths share one instance
//! - **Half-Precision**: memory-efficient f16 embeddings
//!
//! ## Quick Start
//!
//! ```no_run
//! use earnings_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> earnings_embed::Result<()> {
//! let provider = FastEmbedProvider::create(
//!     EmbedConfig::default_with_path("/tmp/models")
//! ).await?;
//!
//! let texts = vec!["Deliveries beat guidance.".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type.
//! An uninitialized provider fails every call fast with
//! [`EmbedError::NotInitialized`] rather than producing a cryptic downstream
//! failure; collaborator failures are wrapped, never retried here.

pub mod config;
pub mod error;
pub mod provider;

// Re-export main types for easy access
pub use config::{DEFAULT_MODEL_NAME, EmbedConfig};
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_creation() {
        let temp_dir = tempdir().unwrap();
        let config = EmbedConfig::default_with_path(temp_dir.path());

        assert_eq!(config.model_name(), "all-minilm-l6-v2");
        assert!(config.fastembed_model().is_ok());
    }
}
