//! Storage abstraction layer for earnings-retriever
//!
//! This module provides trait-based abstractions for storing and retrieving
//! transcript chunks and their embeddings. It separates storage concerns from
//! the ingestion and query logic, allowing a different backend (or an
//! in-memory test double) behind a consistent API.
//!
//! ## Key Components
//!
//! - **ChunkStore**: transcript and chunk persistence operations
//! - **EmbeddingStore**: vector similarity search operations
//! - **CombinedStore**: unified interface combining both stores
//! - **Data Types**: Chunk, TranscriptRef, and metadata structures
//!
//! ## Architecture
//!
//! ```text
//! ChunkStore ─┐
//!             ├─ CombinedStore ── SqliteStore (concrete implementation)
//! EmbeddingStore ─┘
//! ```

use crate::query::filter::MetadataFilter;
use anyhow::Result;
use async_trait::async_trait;

pub mod meta;
pub mod sqlite_store;

/// Database ID for a transcript chunk.
pub type ChunkId = i64;

/// A transcript chunk with its inherited metadata and optional embedding.
///
/// Chunks are the unit of embedding and retrieval. Every chunk carries its
/// parent transcript's metadata verbatim (ticker, quarter, year, source) plus
/// the byte offset where its text starts in the parent, so retrieved chunks
/// are citable without a second lookup.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: Option<ChunkId>,
    /// Source identifier of the parent transcript (the document filename).
    pub source: String,
    pub ticker: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<i64>,
    /// Byte offset of this chunk's text within the parent transcript.
    pub start_offset: usize,
    pub content: String,
    /// Optional vector embedding for semantic search (f16 for efficiency).
    pub embedding: Option<Vec<half::f16>>,
}

/// A transcript record as stored in the index.
///
/// One row per ingested document; re-ingesting the same `source` overwrites
/// it (last write wins). Metadata fields are absent, not defaulted, when the
/// source identifier did not parse.
#[derive(Debug, Clone)]
pub struct TranscriptRef {
    pub source: String,
    pub ticker: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<i64>,
    /// Length of the transcript text in bytes.
    pub text_len: usize,
}

/// Chunk metadata without content.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChunkMetadata {
    pub id: ChunkId,
    pub source: String,
    pub ticker: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<i64>,
    pub start_offset: usize,
    pub has_embedding: bool,
}

/// Transcript and chunk persistence operations.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert or update a transcript record (last write wins per source)
    async fn upsert_transcript(&self, transcript: &TranscriptRef) -> Result<()>;

    /// Replace all chunks of a source with a new set, in one transaction.
    /// Returns the number of chunks written.
    async fn replace_chunks(&self, source: &str, chunks: Vec<Chunk>) -> Result<usize>;

    /// Get a specific chunk by ID
    async fn get_chunk(&self, id: ChunkId) -> Result<Option<Chunk>>;

    /// Get all chunks of a source, ordered by start offset
    async fn get_source_chunks(&self, source: &str) -> Result<Vec<Chunk>>;

    /// List chunk metadata matching the given filter
    async fn list_chunks(&self, filter: &MetadataFilter) -> Result<Vec<ChunkMetadata>>;

    /// Delete all chunks of a source
    async fn delete_chunks(&self, source: &str) -> Result<usize>;
}

/// Vector similarity search operations.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Search for similar chunks using vector similarity, restricted to
    /// chunks matching `filter`. Results are ordered by descending score and
    /// never exceed `limit`.
    async fn search_similar(
        &self,
        query: Vec<half::f16>,
        limit: usize,
        filter: &MetadataFilter,
        threshold: Option<f32>,
    ) -> Result<Vec<(ChunkId, f32)>>;
}

/// Unified store combining chunk and vector operations.
#[async_trait]
pub trait CombinedStore: ChunkStore + EmbeddingStore + Send + Sync {
    /// Search for similar chunks and return full chunk data
    async fn search_chunks(
        &self,
        query: Vec<half::f16>,
        limit: usize,
        filter: &MetadataFilter,
        threshold: Option<f32>,
    ) -> Result<Vec<(Chunk, f32)>>;
}
