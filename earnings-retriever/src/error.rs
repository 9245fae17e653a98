//! Error types for the retrieval pipelines.
//!
//! Collaborator failures are typed by origin so a caller can tell an
//! ingestion-time failure from a query-time one without string matching.
//! Neither pipeline retries internally; recovery is the caller's
//! responsibility. Per-item problems during ingestion (bad filenames,
//! unparseable documents) are not errors at all — they are logged and
//! skipped by the loader.

use earnings_embed::EmbedError;

/// Failure while building or updating the index.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The document source could not be enumerated at all.
    #[error("failed to load transcript documents: {source}")]
    Load {
        #[source]
        source: anyhow::Error,
    },

    /// The embedding collaborator failed while hydrating the index.
    #[error("embedding generation failed during ingestion: {source}")]
    Embedding {
        #[from]
        source: EmbedError,
    },

    /// The index collaborator rejected a write.
    #[error("index write failed: {source}")]
    Index {
        #[source]
        source: anyhow::Error,
    },
}

/// Failure while answering a query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The pipeline's embedding provider was never initialized; every
    /// operation fails fast with this rather than a cryptic downstream error.
    #[error("retrieval pipeline is not initialized")]
    NotInitialized,

    /// The embedding collaborator failed on the query text.
    #[error("query embedding failed: {source}")]
    Embedding {
        #[source]
        source: EmbedError,
    },

    /// The index collaborator is unreachable or misconfigured. Propagated to
    /// the caller uncaught at this layer.
    #[error("vector index unavailable: {source}")]
    IndexUnavailable {
        #[source]
        source: anyhow::Error,
    },
}

impl From<EmbedError> for QueryError {
    fn from(source: EmbedError) -> Self {
        match source {
            EmbedError::NotInitialized => QueryError::NotInitialized,
            other => QueryError::Embedding { source: other },
        }
    }
}
