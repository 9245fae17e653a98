//! earnings-retriever: semantic search over earnings-call transcripts
//!
//! This crate turns a directory of earnings-call transcript documents into a
//! filtered vector index and answers natural-language questions against it
//! with cited, ranked passages. It is the core of a retrieval-augmented
//! generation system: the answer-generating layer sits outside and consumes
//! the serialized grounding context this crate produces.
//!
//! ## Key Modules
//!
//! - **[`ingest`]**: document loading, filename metadata extraction, and the
//!   ingestion engine that chunks, embeds, and writes the index
//! - **[`query`]**: metadata filter construction, filtered top-k retrieval,
//!   and result serialization
//! - **[`storage`]**: storage abstraction layer with a SQLite implementation
//! - **[`error`]**: typed failures, distinguished by pipeline of origin
//!
//! ## Architecture
//!
//! ```text
//! Documents → Loader → Splitter → Embeddings → SQLite Index
//!                                                   ↓
//! Question → Filter Builder → Retriever → Serializer → Grounding Context
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use earnings_retriever::ingest::{IngestConfig, IngestEngine};
//! use earnings_retriever::query::{RetrievalRequest, Retriever, GroundingContext};
//! use earnings_retriever::storage::sqlite_store::{SqliteStore, TranscriptIndex};
//! use earnings_embed::{EmbedConfig, FastEmbedProvider};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let index = TranscriptIndex::open(Path::new(".")).await?;
//! let provider = Arc::new(
//!     FastEmbedProvider::create(EmbedConfig::default_with_path(".models")).await?,
//! );
//!
//! let engine = IngestEngine::new(IngestConfig::default(), index.clone(), provider.clone());
//! let report = engine.ingest_directory(Path::new("transcripts")).await?;
//! println!("loaded {} documents", report.documents_loaded);
//!
//! let retriever = Retriever::new(Arc::new(SqliteStore::new(index)), provider);
//! let result = retriever
//!     .retrieve(&RetrievalRequest {
//!         query: "What did management say about the R2?".into(),
//!         ticker: Some("RIVN".into()),
//!         quarter: Some("Q4".into()),
//!         year: None,
//!     })
//!     .await?;
//! let grounding = GroundingContext::from_result(result);
//! println!("{}", grounding.context);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ingest;
pub mod query;
pub mod storage;
