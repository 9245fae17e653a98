//! Ingestion engine: the index-writing half of the system.
//!
//! Orchestrates the full ingestion pipeline: load transcript documents,
//! split each into overlapping chunks that inherit the parent's metadata,
//! embed the chunk texts in batches, and persist (text, vector, metadata)
//! through the store — one transaction per document, keyed by
//! `(source, start_offset)` so re-ingestion replaces rather than duplicates.
//!
//! Ingestion is a single-threaded batch over independent documents. The only
//! suspension points are the embedding calls and the store writes; nothing
//! here spawns background tasks or retries.

use super::loader::{TranscriptRecord, load_transcripts};
use crate::error::IngestError;
use crate::storage::meta::{CollectionMetadata, DEFAULT_COLLECTION, EmbeddingModelMetadata};
use crate::storage::sqlite_store::TranscriptIndex;
use crate::storage::{Chunk, TranscriptRef};
use earnings_context::text::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TRANSCRIPT_SEPARATORS, TranscriptSplitter,
};
use earnings_embed::EmbeddingProvider;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for the ingestion engine
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Name of the collection this index holds
    pub collection: String,
    /// Maximum chunk size in bytes
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in bytes
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl IngestConfig {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Set the maximum chunk size in bytes.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in bytes.
    pub fn with_chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestReport {
    pub documents_loaded: usize,
    pub documents_skipped: usize,
    pub chunks_written: usize,
    pub embeddings_generated: usize,
}

/// The ingestion engine: loads, chunks, embeds, and persists transcripts.
pub struct IngestEngine {
    config: IngestConfig,
    index: TranscriptIndex,
    splitter: TranscriptSplitter,
    provider: Arc<dyn EmbeddingProvider>,
}

impl IngestEngine {
    /// Create an engine over the given index and embedding provider.
    ///
    /// Both collaborators are constructed by the host and injected; the
    /// engine holds no global state.
    pub fn new(
        config: IngestConfig,
        index: TranscriptIndex,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let splitter = TranscriptSplitter::new(
            DEFAULT_TRANSCRIPT_SEPARATORS,
            config.chunk_size,
            config.chunk_overlap,
        );
        Self {
            config,
            index,
            splitter,
            provider,
        }
    }

    /// Ingest every transcript document in `dir`.
    ///
    /// Per-file problems are skipped by the loader and show up in the
    /// report counts; embedding and index failures abort the run with a
    /// typed error.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport, IngestError> {
        info!("Starting ingestion from {}", dir.display());

        let outcome = load_transcripts(dir)
            .await
            .map_err(|source| IngestError::Load { source })?;

        let mut report = IngestReport {
            documents_skipped: outcome.skipped,
            ..IngestReport::default()
        };

        if outcome.records.is_empty() {
            warn!("No documents found to process");
            return Ok(report);
        }

        self.register_collection().await?;

        for record in &outcome.records {
            let (chunks, embedded) = self.ingest_record(record).await?;
            report.documents_loaded += 1;
            report.chunks_written += chunks;
            report.embeddings_generated += embedded;
        }

        info!(
            "Ingestion complete: {} documents loaded, {} skipped, {} chunks written",
            report.documents_loaded, report.documents_skipped, report.chunks_written
        );
        Ok(report)
    }

    /// Ingest a single transcript record. Returns (chunks written,
    /// embeddings generated).
    pub async fn ingest_record(
        &self,
        record: &TranscriptRecord,
    ) -> Result<(usize, usize), IngestError> {
        let spans = self.splitter.split(&record.source, &record.text);
        let texts: Vec<String> = spans.iter().map(|span| span.chunk_text.clone()).collect();

        let embeddings = self.provider.embed_texts(&texts).await?;
        if embeddings.len() != spans.len() {
            return Err(IngestError::Embedding {
                source: earnings_embed::EmbedError::invalid_config(format!(
                    "expected {} embeddings, got {}",
                    spans.len(),
                    embeddings.len()
                )),
            });
        }

        // Every chunk inherits the parent record's metadata unchanged.
        let chunks: Vec<Chunk> = spans
            .into_iter()
            .zip(embeddings.embeddings)
            .map(|(span, embedding)| Chunk {
                id: None,
                source: record.source.clone(),
                ticker: record.metadata.ticker.clone(),
                quarter: record.metadata.quarter.clone(),
                year: record.metadata.year,
                start_offset: span.start_offset,
                content: span.chunk_text,
                embedding: Some(embedding),
            })
            .collect();

        self.index
            .upsert_transcript(&TranscriptRef {
                source: record.source.clone(),
                ticker: record.metadata.ticker.clone(),
                quarter: record.metadata.quarter.clone(),
                year: record.metadata.year,
                text_len: record.text.len(),
            })
            .await
            .map_err(|source| IngestError::Index { source })?;

        let written = self
            .index
            .replace_chunks(&record.source, &chunks)
            .await
            .map_err(|source| IngestError::Index { source })?;

        info!(
            "Indexed {} as {} chunks ({} embedded)",
            record.source,
            written,
            chunks.iter().filter(|c| c.embedding.is_some()).count()
        );
        Ok((written, chunks.len()))
    }

    async fn register_collection(&self) -> Result<(), IngestError> {
        let model = EmbeddingModelMetadata::new(
            self.provider.model_name().to_string(),
            self.provider.provider_name().to_string(),
            self.provider.embedding_dimension(),
        )
        .with_normalized(true);

        self.index
            .register_embedding_model(&model)
            .await
            .map_err(|source| IngestError::Index { source })?;

        let collection = CollectionMetadata::new(self.config.collection.clone()).with_model(&model);
        self.index
            .upsert_collection_metadata(&collection)
            .await
            .map_err(|source| IngestError::Index { source })?;
        Ok(())
    }
}
