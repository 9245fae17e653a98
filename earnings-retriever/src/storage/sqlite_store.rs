//! Core SQLite database operations for transcript and chunk storage.
//!
//! This module is the foundational data layer for earnings-retriever: direct
//! SQLite operations for storing transcripts, their chunks, and chunk
//! embeddings, plus the trait adapter that exposes them through the storage
//! abstractions in [`super`].
//!
//! ## Key Components
//!
//! - **TranscriptIndex**: main database interface with tuned SQLite settings
//! - **SqliteStore**: adapter implementing ChunkStore, EmbeddingStore, and
//!   CombinedStore on top of TranscriptIndex
//! - **Vector Operations**: in-process cosine similarity over f16 embeddings
//!
//! ## Database Schema
//!
//! ```sql
//! -- Transcripts table: one row per ingested document
//! CREATE TABLE transcripts (
//!     source TEXT PRIMARY KEY,         -- document filename
//!     ticker TEXT,                     -- NULL when the filename did not parse
//!     quarter TEXT,
//!     year INTEGER,
//!     text_len INTEGER,                -- transcript length in bytes
//!     ingested_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! -- Chunks table: overlapping windows with inherited metadata
//! CREATE TABLE chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     source TEXT REFERENCES transcripts(source),
//!     ticker TEXT,                     -- denormalized from the transcript
//!     quarter TEXT,
//!     year INTEGER,
//!     start_offset INTEGER,            -- byte offset in the parent text
//!     content TEXT,                    -- actual chunk text
//!     embedding BLOB,                  -- f16 embedding vector (optional)
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! Chunk identity is `UNIQUE(source, start_offset)`, and re-ingesting a
//! source replaces its chunks inside one transaction, so repeated ingestion
//! of the same document is idempotent and never accumulates duplicates.
//!
//! ## SQLite Settings
//!
//! - **WAL mode**: concurrent reads while writes are serialized by the pool
//! - **Large page size** (64KB): suits embedding blob storage
//! - **Foreign keys**: chunk rows follow their transcript on delete

use super::{Chunk, ChunkId, ChunkMetadata, ChunkStore, CombinedStore, EmbeddingStore, TranscriptRef};
use crate::query::filter::{FilterCondition, MetadataFilter};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

/// SQLite-based transcript and chunk index.
///
/// Low-level database operations; the public storage API is the trait-based
/// [`SqliteStore`] wrapper. Cloning is cheap (the connection pool is shared).
#[derive(Clone, Debug)]
pub struct TranscriptIndex {
    pub(crate) base: PathBuf,
    pool: SqlitePool,
}

/// Aggregate counts over the index, for run summaries and the stats command.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexStats {
    pub transcripts: usize,
    pub chunks: usize,
    pub chunks_with_embeddings: usize,
}

impl TranscriptIndex {
    /// Opens the index with persistent SQLite storage under `base`.
    pub async fn open(base: &Path) -> Result<Self> {
        let db_path = base.join(".earnings-rag.db");

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(base, pool).await
    }

    /// Opens the index with in-memory SQLite storage, for testing.
    ///
    /// Pinned to a single connection: every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub async fn open_memory(base: &Path) -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new_with_pool(base, pool).await
    }

    async fn new_with_pool(base: &Path, pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Self::create_meta_tables(&pool).await?;

        Ok(Self {
            base: base.to_path_buf(),
            pool,
        })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transcripts (
                source TEXT PRIMARY KEY,
                ticker TEXT,
                quarter TEXT,
                year INTEGER,
                text_len INTEGER NOT NULL,
                ingested_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                ticker TEXT,
                quarter TEXT,
                year INTEGER,
                start_offset INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                CONSTRAINT unique_chunk UNIQUE(source, start_offset),
                FOREIGN KEY (source) REFERENCES transcripts(source) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_ticker ON chunks(ticker)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_year ON chunks(year)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Inserts or updates a transcript record (last write wins per source).
    pub async fn upsert_transcript(&self, transcript: &TranscriptRef) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transcripts (source, ticker, quarter, year, text_len, ingested_at)
            VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(source) DO UPDATE SET
                ticker = excluded.ticker,
                quarter = excluded.quarter,
                year = excluded.year,
                text_len = excluded.text_len,
                ingested_at = datetime('now')
            "#,
        )
        .bind(&transcript.source)
        .bind(transcript.ticker.as_deref())
        .bind(transcript.quarter.as_deref())
        .bind(transcript.year)
        .bind(transcript.text_len as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replaces every chunk of `source` with the given set, transactionally.
    ///
    /// Delete-then-insert keeps re-ingestion idempotent even when a document
    /// shrinks: no stale tail chunk can survive a rewrite.
    pub async fn replace_chunks(&self, source: &str, chunks: &[Chunk]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE source = ?1")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            let embedding_bytes = chunk
                .embedding
                .as_ref()
                .map(|e| bytemuck::cast_slice::<half::f16, u8>(e));

            sqlx::query(
                r#"
                INSERT INTO chunks (source, ticker, quarter, year, start_offset, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&chunk.source)
            .bind(chunk.ticker.as_deref())
            .bind(chunk.quarter.as_deref())
            .bind(chunk.year)
            .bind(chunk.start_offset as i64)
            .bind(&chunk.content)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(chunks.len())
    }

    /// Get the chunks of a source, ordered by start offset
    pub async fn get_chunks(&self, source: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT id, source, ticker, quarter, year, start_offset, content, embedding
             FROM chunks WHERE source = ?1 ORDER BY start_offset",
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| chunk_from_row(&row)).collect())
    }

    /// Get a chunk by ID
    pub async fn get_chunk_by_id(&self, id: ChunkId) -> Result<Option<Chunk>> {
        let row = sqlx::query(
            "SELECT id, source, ticker, quarter, year, start_offset, content, embedding
             FROM chunks WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| chunk_from_row(&row)))
    }

    /// Delete all chunks of a source
    pub async fn delete_chunks(&self, source: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM chunks WHERE source = ?1")
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    /// Get all embedded chunks matching the metadata filter.
    ///
    /// This is the candidate set for similarity search: filtering happens in
    /// SQL so an indexed equality can prune before any vector math runs.
    pub async fn get_embedded_chunks(&self, filter: &MetadataFilter) -> Result<Vec<Chunk>> {
        let mut sql = String::from(
            "SELECT id, source, ticker, quarter, year, start_offset, content, embedding
             FROM chunks WHERE embedding IS NOT NULL",
        );
        append_filter_sql(&mut sql, filter);

        let query = bind_filter(sqlx::query(&sql), filter);
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(|row| chunk_from_row(&row)).collect())
    }

    /// List chunk metadata matching the filter, ordered by source and offset
    pub async fn list_chunks(&self, filter: &MetadataFilter) -> Result<Vec<ChunkMetadata>> {
        let mut sql = String::from(
            "SELECT id, source, ticker, quarter, year, start_offset, embedding IS NOT NULL AS has_embedding
             FROM chunks WHERE 1 = 1",
        );
        append_filter_sql(&mut sql, filter);
        sql.push_str(" ORDER BY source, start_offset");

        let query = bind_filter(sqlx::query(&sql), filter);
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| ChunkMetadata {
                id: row.get("id"),
                source: row.get("source"),
                ticker: row.get("ticker"),
                quarter: row.get("quarter"),
                year: row.get("year"),
                start_offset: row.get::<i64, _>("start_offset") as usize,
                has_embedding: row.get("has_embedding"),
            })
            .collect())
    }

    /// Aggregate counts over the index
    pub async fn stats(&self) -> Result<IndexStats> {
        let transcripts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transcripts")
            .fetch_one(&self.pool)
            .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let chunks_with_embeddings: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(IndexStats {
            transcripts: transcripts as usize,
            chunks: chunks as usize,
            chunks_with_embeddings: chunks_with_embeddings as usize,
        })
    }

    /// Base directory this index was opened under
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Get the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn chunk_from_row(row: &SqliteRow) -> Chunk {
    let embedding_bytes: Option<Vec<u8>> = row.get("embedding");
    let embedding = embedding_bytes.map(|bytes| bytemuck::pod_collect_to_vec::<u8, half::f16>(&bytes));

    Chunk {
        id: Some(row.get("id")),
        source: row.get("source"),
        ticker: row.get("ticker"),
        quarter: row.get("quarter"),
        year: row.get("year"),
        start_offset: row.get::<i64, _>("start_offset") as usize,
        content: row.get("content"),
        embedding,
    }
}

fn append_filter_sql(sql: &mut String, filter: &MetadataFilter) {
    for condition in filter.conditions() {
        match condition {
            FilterCondition::Ticker(_) => sql.push_str(" AND ticker = ?"),
            FilterCondition::Quarter(_) => sql.push_str(" AND quarter = ?"),
            FilterCondition::Year(_) => sql.push_str(" AND year = ?"),
        }
    }
}

fn bind_filter<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    filter: &'q MetadataFilter,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let mut query = query;
    for condition in filter.conditions() {
        query = match condition {
            FilterCondition::Ticker(ticker) => query.bind(ticker),
            FilterCondition::Quarter(quarter) => query.bind(quarter),
            FilterCondition::Year(year) => query.bind(year),
        };
    }
    query
}

/// SQLite-based implementation of the storage traits.
pub struct SqliteStore {
    index: TranscriptIndex,
}

impl SqliteStore {
    /// Creates a new SQLite store over a transcript index.
    pub fn new(index: TranscriptIndex) -> Self {
        Self { index }
    }

    /// The underlying transcript index
    pub fn index(&self) -> &TranscriptIndex {
        &self.index
    }
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn upsert_transcript(&self, transcript: &TranscriptRef) -> Result<()> {
        self.index.upsert_transcript(transcript).await
    }

    async fn replace_chunks(&self, source: &str, chunks: Vec<Chunk>) -> Result<usize> {
        self.index.replace_chunks(source, &chunks).await
    }

    async fn get_chunk(&self, id: ChunkId) -> Result<Option<Chunk>> {
        self.index.get_chunk_by_id(id).await
    }

    async fn get_source_chunks(&self, source: &str) -> Result<Vec<Chunk>> {
        self.index.get_chunks(source).await
    }

    async fn list_chunks(&self, filter: &MetadataFilter) -> Result<Vec<ChunkMetadata>> {
        self.index.list_chunks(filter).await
    }

    async fn delete_chunks(&self, source: &str) -> Result<usize> {
        self.index.delete_chunks(source).await
    }
}

#[async_trait]
impl EmbeddingStore for SqliteStore {
    async fn search_similar(
        &self,
        query: Vec<half::f16>,
        limit: usize,
        filter: &MetadataFilter,
        threshold: Option<f32>,
    ) -> Result<Vec<(ChunkId, f32)>> {
        let candidates = self.index.get_embedded_chunks(filter).await?;

        let mut similarities: Vec<(ChunkId, f32)> = Vec::new();
        for chunk in candidates {
            if let (Some(id), Some(embedding)) = (chunk.id, chunk.embedding) {
                let similarity = cosine_similarity(&query, &embedding);
                match threshold {
                    Some(min) if similarity < min => {}
                    _ => similarities.push((id, similarity)),
                }
            }
        }

        // Rank by similarity score (descending)
        similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        similarities.truncate(limit);

        Ok(similarities)
    }
}

#[async_trait]
impl CombinedStore for SqliteStore {
    async fn search_chunks(
        &self,
        query: Vec<half::f16>,
        limit: usize,
        filter: &MetadataFilter,
        threshold: Option<f32>,
    ) -> Result<Vec<(Chunk, f32)>> {
        let similar = self.search_similar(query, limit, filter, threshold).await?;

        let mut results = Vec::new();
        for (chunk_id, score) in similar {
            if let Some(chunk) = self.get_chunk(chunk_id).await? {
                results.push((chunk, score));
            }
        }

        Ok(results)
    }
}

/// Cosine similarity between two f16 vectors, computed in f32.
fn cosine_similarity(a: &[half::f16], b: &[half::f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        let a_f32 = a[i].to_f32();
        let b_f32 = b[i].to_f32();
        dot_product += a_f32 * b_f32;
        norm_a += a_f32 * a_f32;
        norm_b += b_f32 * b_f32;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;
    use tempfile::tempdir;

    fn vector(values: &[f32]) -> Vec<f16> {
        values.iter().copied().map(f16::from_f32).collect()
    }

    fn chunk(source: &str, ticker: &str, quarter: &str, year: i64, offset: usize, embedding: &[f32]) -> Chunk {
        Chunk {
            id: None,
            source: source.to_string(),
            ticker: Some(ticker.to_string()),
            quarter: Some(quarter.to_string()),
            year: Some(year),
            start_offset: offset,
            content: format!("{ticker} chunk at {offset}"),
            embedding: Some(vector(embedding)),
        }
    }

    async fn seeded_store() -> Result<SqliteStore> {
        let temp_dir = tempdir()?;
        let index = TranscriptIndex::open_memory(temp_dir.path()).await?;
        let store = SqliteStore::new(index);

        store
            .upsert_transcript(&TranscriptRef {
                source: "RIVN_Q4_2025.json".to_string(),
                ticker: Some("RIVN".to_string()),
                quarter: Some("Q4".to_string()),
                year: Some(2025),
                text_len: 2000,
            })
            .await?;
        store
            .upsert_transcript(&TranscriptRef {
                source: "TSLA_Q4_2025.json".to_string(),
                ticker: Some("TSLA".to_string()),
                quarter: Some("Q4".to_string()),
                year: Some(2025),
                text_len: 2000,
            })
            .await?;

        store
            .replace_chunks(
                "RIVN_Q4_2025.json",
                vec![
                    chunk("RIVN_Q4_2025.json", "RIVN", "Q4", 2025, 0, &[1.0, 0.0, 0.0]),
                    chunk("RIVN_Q4_2025.json", "RIVN", "Q4", 2025, 800, &[0.9, 0.1, 0.0]),
                ],
            )
            .await?;
        store
            .replace_chunks(
                "TSLA_Q4_2025.json",
                vec![chunk("TSLA_Q4_2025.json", "TSLA", "Q4", 2025, 0, &[0.0, 1.0, 0.0])],
            )
            .await?;

        Ok(store)
    }

    #[tokio::test]
    async fn chunks_round_trip_with_metadata_and_embeddings() -> Result<()> {
        let store = seeded_store().await?;

        let chunks = store.get_source_chunks("RIVN_Q4_2025.json").await?;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[1].start_offset, 800);
        for c in &chunks {
            assert_eq!(c.ticker.as_deref(), Some("RIVN"));
            assert_eq!(c.quarter.as_deref(), Some("Q4"));
            assert_eq!(c.year, Some(2025));
            assert!(c.embedding.is_some());
        }
        assert_eq!(chunks[0].embedding.as_ref().unwrap(), &vector(&[1.0, 0.0, 0.0]));

        Ok(())
    }

    #[tokio::test]
    async fn replacing_chunks_is_idempotent() -> Result<()> {
        let store = seeded_store().await?;

        // Re-ingest the same source with fewer chunks: the old set must be
        // fully replaced, not appended to.
        store
            .replace_chunks(
                "RIVN_Q4_2025.json",
                vec![chunk("RIVN_Q4_2025.json", "RIVN", "Q4", 2025, 0, &[1.0, 0.0, 0.0])],
            )
            .await?;

        let chunks = store.get_source_chunks("RIVN_Q4_2025.json").await?;
        assert_eq!(chunks.len(), 1);

        let stats = store.index().stats().await?;
        assert_eq!(stats.chunks, 2); // 1 RIVN + 1 TSLA
        Ok(())
    }

    #[tokio::test]
    async fn filtered_search_excludes_other_tickers() -> Result<()> {
        let store = seeded_store().await?;
        let query = vector(&[1.0, 0.0, 0.0]);

        let rivn = MetadataFilter::from_hints(Some("RIVN"), Some("Q4"), Some(2025));
        let results = store.search_chunks(query.clone(), 10, &rivn, None).await?;
        assert_eq!(results.len(), 2);
        for (chunk, _) in &results {
            assert_eq!(chunk.ticker.as_deref(), Some("RIVN"));
        }
        // Ranked by descending similarity
        assert!(results[0].1 >= results[1].1);
        assert_eq!(results[0].0.start_offset, 0);

        let tsla = MetadataFilter::from_hints(Some("TSLA"), None, None);
        let results = store.search_chunks(query, 10, &tsla, None).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.source, "TSLA_Q4_2025.json");

        Ok(())
    }

    #[tokio::test]
    async fn unmatched_filter_returns_empty_not_error() -> Result<()> {
        let store = seeded_store().await?;
        let filter = MetadataFilter::from_hints(Some("LCID"), None, None);

        let results = store
            .search_chunks(vector(&[1.0, 0.0, 0.0]), 10, &filter, None)
            .await?;
        assert!(results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn search_respects_limit_and_threshold() -> Result<()> {
        let store = seeded_store().await?;
        let query = vector(&[1.0, 0.0, 0.0]);
        let unfiltered = MetadataFilter::default();

        let limited = store
            .search_similar(query.clone(), 1, &unfiltered, None)
            .await?;
        assert_eq!(limited.len(), 1);

        // The TSLA chunk is orthogonal to the query; a mid threshold drops it
        let thresholded = store
            .search_similar(query, 10, &unfiltered, Some(0.5))
            .await?;
        assert_eq!(thresholded.len(), 2);
        for (_, score) in &thresholded {
            assert!(*score >= 0.5);
        }
        Ok(())
    }

    #[tokio::test]
    async fn list_chunks_applies_the_filter() -> Result<()> {
        let store = seeded_store().await?;

        let all = store.list_chunks(&MetadataFilter::default()).await?;
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|m| m.has_embedding));

        let rivn = store
            .list_chunks(&MetadataFilter::from_hints(Some("RIVN"), None, None))
            .await?;
        assert_eq!(rivn.len(), 2);
        Ok(())
    }

    #[test]
    fn test_cosine_similarity() {
        // Identical vectors
        let a = vector(&[1.0, 0.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &a), 1.0);

        // Orthogonal vectors
        let a = vector(&[1.0, 0.0]);
        let b = vector(&[0.0, 1.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);

        // Opposite vectors
        let a = vector(&[1.0, 0.0]);
        let b = vector(&[-1.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &b), -1.0);

        // Known angle
        let a = vector(&[0.6, 0.8]);
        let b = vector(&[0.8, 0.6]);
        assert!((cosine_similarity(&a, &b) - 0.96).abs() < 0.01);

        // Zero vector
        let a = vector(&[0.0, 0.0]);
        let b = vector(&[1.0, 1.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);

        // Mismatched lengths
        let a = vector(&[1.0, 2.0]);
        let b = vector(&[1.0, 2.0, 3.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
