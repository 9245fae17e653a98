//! Collection and embedding-model metadata for the index.
//!
//! Query embeddings are only comparable to document embeddings produced by
//! the same model, so the index records which model hydrated it. The
//! collection row identifies the logical partition of the index (one
//! collection holds all chunks for this system) and points at the registered
//! model.

use super::sqlite_store::TranscriptIndex;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Default collection name for the earnings-call index.
pub const DEFAULT_COLLECTION: &str = "earnings_collection";

/// Metadata about the embedding model used for generating embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModelMetadata {
    /// Name of the embedding model (e.g., "all-minilm-l6-v2")
    pub model_name: String,
    /// Provider of the embedding model (e.g., "fastembed")
    pub provider: String,
    /// Dimension of the embedding vectors
    pub dimension: usize,
    /// Whether embeddings are normalized
    pub normalized: bool,
}

impl EmbeddingModelMetadata {
    pub fn new(model_name: String, provider: String, dimension: usize) -> Self {
        Self {
            model_name,
            provider,
            dimension,
            normalized: false,
        }
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Create a unique identifier for this model configuration
    pub fn model_id(&self) -> String {
        let normalized_part = if self.normalized { "norm" } else { "raw" };
        format!(
            "{}:{}:{}:{}",
            self.provider, self.model_name, self.dimension, normalized_part
        )
    }
}

/// Metadata about the collection held by this index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Name of the collection (the logical partition of the vector index)
    pub collection: String,
    /// Version of earnings-retriever that created this collection
    pub retriever_version: String,
    /// Timestamp when the collection was created
    pub created_at: i64,
    /// Timestamp when the collection was last updated
    pub updated_at: i64,
    /// Model that hydrated this collection, if embeddings were generated
    pub model_id: Option<String>,
}

impl CollectionMetadata {
    pub fn new(collection: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            collection: collection.into(),
            retriever_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: now,
            updated_at: now,
            model_id: None,
        }
    }

    pub fn with_model(mut self, model: &EmbeddingModelMetadata) -> Self {
        self.model_id = Some(model.model_id());
        self
    }
}

impl TranscriptIndex {
    pub(super) async fn create_meta_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embedding_models (
                model_id TEXT PRIMARY KEY,
                model_name TEXT NOT NULL,
                provider TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                normalized BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                collection TEXT PRIMARY KEY,
                retriever_version TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                model_id TEXT REFERENCES embedding_models(model_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Register an embedding model
    pub async fn register_embedding_model(&self, model: &EmbeddingModelMetadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO embedding_models (model_id, model_name, provider, dimension, normalized)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(model_id) DO UPDATE SET
                model_name = excluded.model_name,
                provider = excluded.provider,
                dimension = excluded.dimension,
                normalized = excluded.normalized
            "#,
        )
        .bind(model.model_id())
        .bind(&model.model_name)
        .bind(&model.provider)
        .bind(model.dimension as i64)
        .bind(model.normalized)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Get embedding model metadata by ID
    pub async fn get_embedding_model(
        &self,
        model_id: &str,
    ) -> Result<Option<EmbeddingModelMetadata>> {
        let row = sqlx::query("SELECT * FROM embedding_models WHERE model_id = ?1")
            .bind(model_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|row| EmbeddingModelMetadata {
            model_name: row.get("model_name"),
            provider: row.get("provider"),
            dimension: row.get::<i64, _>("dimension") as usize,
            normalized: row.get("normalized"),
        }))
    }

    /// Initialize or update collection metadata
    pub async fn upsert_collection_metadata(&self, metadata: &CollectionMetadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collections (collection, retriever_version, created_at, updated_at, model_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(collection) DO UPDATE SET
                retriever_version = excluded.retriever_version,
                updated_at = excluded.updated_at,
                model_id = excluded.model_id
            "#,
        )
        .bind(&metadata.collection)
        .bind(&metadata.retriever_version)
        .bind(metadata.created_at)
        .bind(metadata.updated_at)
        .bind(metadata.model_id.as_deref())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Get collection metadata by name
    pub async fn get_collection_metadata(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionMetadata>> {
        let row = sqlx::query("SELECT * FROM collections WHERE collection = ?1")
            .bind(collection)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|row| CollectionMetadata {
            collection: row.get("collection"),
            retriever_version: row.get("retriever_version"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            model_id: row.get("model_id"),
        }))
    }
}
