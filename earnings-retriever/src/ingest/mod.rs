//! Ingestion pipeline: documents in, indexed chunks out.

pub mod engine;
pub mod loader;
pub mod metadata;

pub use engine::{IngestConfig, IngestEngine, IngestReport};
pub use loader::{LoadOutcome, TranscriptRecord, load_transcripts};
pub use metadata::{SourceMetadata, extract_source_metadata};
