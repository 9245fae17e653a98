//! Filtered top-k retrieval over the transcript index.
//!
//! The retriever is a plain typed function over a [`RetrievalRequest`]:
//! free-text query plus independently optional ticker/quarter/year hints.
//! It embeds the query with the same provider that embedded the documents,
//! builds a metadata filter from the hints, and runs a similarity search
//! constrained by that filter. How a caller decides to invoke it (a chat
//! agent's tool call, an HTTP handler, the CLI) is outside this layer.

use crate::error::QueryError;
use crate::query::filter::MetadataFilter;
use crate::storage::{Chunk, CombinedStore};
use earnings_embed::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Default number of results returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// One retrieval invocation: a question plus optional structured hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Free-text query to search for.
    pub query: String,
    /// Company ticker hint (e.g. "RIVN"); any case.
    #[serde(default)]
    pub ticker: Option<String>,
    /// Fiscal quarter hint (e.g. "Q4"); any case.
    #[serde(default)]
    pub quarter: Option<String>,
    /// Fiscal year hint (e.g. 2025).
    #[serde(default)]
    pub year: Option<i64>,
}

impl RetrievalRequest {
    /// A request with no metadata hints.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ticker: None,
            quarter: None,
            year: None,
        }
    }
}

/// One ranked retrieval match with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub source: String,
    pub ticker: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<i64>,
    pub start_offset: usize,
    pub content: String,
    /// Cosine similarity against the query, in descending rank order.
    pub score: f32,
}

impl ScoredChunk {
    fn from_match(chunk: Chunk, score: f32) -> Self {
        Self {
            source: chunk.source,
            ticker: chunk.ticker,
            quarter: chunk.quarter,
            year: chunk.year,
            start_offset: chunk.start_offset,
            content: chunk.content,
            score,
        }
    }
}

/// Ranked result of a single query. Empty is a valid outcome, not an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub matches: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Executes filtered top-k similarity searches.
///
/// Both collaborators are injected: the store handle and the embedding
/// provider are constructed by the host, never global state, so tests can
/// substitute doubles for either.
pub struct Retriever {
    store: Arc<dyn CombinedStore>,
    provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    threshold: Option<f32>,
}

impl Retriever {
    pub fn new(store: Arc<dyn CombinedStore>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider,
            top_k: DEFAULT_TOP_K,
            threshold: None,
        }
    }

    /// Set the maximum number of results per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Require a minimum similarity score for returned matches.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Retrieve the top-k chunks matching the request.
    ///
    /// Zero matches is an empty result, not an error. An unreachable or
    /// misconfigured index surfaces as [`QueryError::IndexUnavailable`] and
    /// is not caught here; an uninitialized embedding provider surfaces as
    /// [`QueryError::NotInitialized`].
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalResult, QueryError> {
        let filter = MetadataFilter::from_hints(
            request.ticker.as_deref(),
            request.quarter.as_deref(),
            request.year,
        );

        if filter.is_empty() {
            info!("Executing search across all documents (no filter applied)");
        } else {
            info!("Executing search with filter: {filter:?}");
        }

        let query_embedding = self.provider.embed_text(&request.query).await?;

        let matches = self
            .store
            .search_chunks(query_embedding, self.top_k, &filter, self.threshold)
            .await
            .map_err(|source| QueryError::IndexUnavailable { source })?;

        Ok(RetrievalResult {
            matches: matches
                .into_iter()
                .map(|(chunk, score)| ScoredChunk::from_match(chunk, score))
                .collect(),
        })
    }
}
