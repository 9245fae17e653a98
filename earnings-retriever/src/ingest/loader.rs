//! Transcript document loading.
//!
//! Reads a flat directory of `*.json` transcript documents, extracts the
//! full-call text field from each, and attaches filename-derived metadata
//! plus the filename itself as provenance. One bad file never aborts the
//! batch: per-file parse failures, IO errors, and missing text fields are
//! logged and the file is skipped, and the outcome reports how many
//! documents loaded versus how many were skipped.

use super::metadata::{SourceMetadata, extract_source_metadata};
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use tracing::{error, info, warn};

/// JSON field holding the transcript text in source documents.
pub const TRANSCRIPT_TEXT_FIELD: &str = "full_conference_call_transcript";

/// One successfully loaded earnings-call transcript.
///
/// Created at ingestion time and never mutated; re-ingesting the same source
/// supersedes the earlier record (last write wins).
#[derive(Debug, Clone)]
pub struct TranscriptRecord {
    /// Source identifier: the document filename, unique per record.
    pub source: String,
    /// The full transcript text (non-empty).
    pub text: String,
    /// Filename-derived metadata; all fields absent when the name did not parse.
    pub metadata: SourceMetadata,
}

/// Result of loading a directory of transcripts.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<TranscriptRecord>,
    /// Documents that were recognized but could not be loaded.
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct TranscriptDocument {
    #[serde(default)]
    full_conference_call_transcript: String,
}

/// Loads every `*.json` transcript in `dir`.
///
/// A missing or unreadable directory is an error (there is nothing to
/// ingest); any failure scoped to a single file is logged and counted as
/// skipped instead.
pub async fn load_transcripts(dir: &Path) -> Result<LoadOutcome> {
    let mut outcome = LoadOutcome::default();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let source = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        match read_transcript_text(&path).await {
            Ok(Some(text)) => {
                let metadata = extract_source_metadata(&source);
                info!("Loaded {source} with metadata: {metadata:?}");
                outcome.records.push(TranscriptRecord {
                    source,
                    text,
                    metadata,
                });
            }
            Ok(None) => {
                warn!("No '{TRANSCRIPT_TEXT_FIELD}' field found in {source}");
                outcome.skipped += 1;
            }
            Err(e) => {
                error!("Error processing {source}: {e}");
                outcome.skipped += 1;
            }
        }
    }

    Ok(outcome)
}

async fn read_transcript_text(path: &Path) -> Result<Option<String>> {
    let bytes = tokio::fs::read(path).await?;
    let document: TranscriptDocument = serde_json::from_slice(&bytes)?;

    if document.full_conference_call_transcript.is_empty() {
        Ok(None)
    } else {
        Ok(Some(document.full_conference_call_transcript))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
        tokio::fs::write(dir.join(name), serde_json::to_vec(&value).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn loads_documents_and_attaches_metadata() -> Result<()> {
        let temp_dir = tempdir()?;
        write_json(
            temp_dir.path(),
            "RIVN_Q4_2025.json",
            serde_json::json!({
                TRANSCRIPT_TEXT_FIELD: "Good afternoon, and thank you for joining.",
                "speakers": ["operator"],
            }),
        )
        .await;

        let outcome = load_transcripts(temp_dir.path()).await?;
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped, 0);

        let record = &outcome.records[0];
        assert_eq!(record.source, "RIVN_Q4_2025.json");
        assert_eq!(record.metadata.ticker.as_deref(), Some("RIVN"));
        assert_eq!(record.metadata.year, Some(2025));
        assert!(record.text.starts_with("Good afternoon"));
        Ok(())
    }

    #[tokio::test]
    async fn one_bad_file_never_aborts_the_batch() -> Result<()> {
        let temp_dir = tempdir()?;
        write_json(
            temp_dir.path(),
            "TSLA_Q1_2025.json",
            serde_json::json!({ TRANSCRIPT_TEXT_FIELD: "Deliveries beat guidance." }),
        )
        .await;
        // Malformed JSON
        tokio::fs::write(temp_dir.path().join("broken.json"), b"{not json").await?;
        // Valid JSON but missing the text field
        write_json(
            temp_dir.path(),
            "LCID_Q2_2025.json",
            serde_json::json!({ "summary": "no transcript here" }),
        )
        .await;
        // Empty text field
        write_json(
            temp_dir.path(),
            "F_Q3_2025.json",
            serde_json::json!({ TRANSCRIPT_TEXT_FIELD: "" }),
        )
        .await;
        // Not a JSON document at all; silently ignored, not counted
        tokio::fs::write(temp_dir.path().join("README.txt"), b"notes").await?;

        let outcome = load_transcripts(temp_dir.path()).await?;
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].source, "TSLA_Q1_2025.json");
        assert_eq!(outcome.skipped, 3);
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_filenames_keep_the_record_with_empty_metadata() -> Result<()> {
        let temp_dir = tempdir()?;
        write_json(
            temp_dir.path(),
            "fourth_quarter_call.json",
            serde_json::json!({ TRANSCRIPT_TEXT_FIELD: "Welcome everyone." }),
        )
        .await;

        let outcome = load_transcripts(temp_dir.path()).await?;
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].metadata.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        assert!(load_transcripts(&missing).await.is_err());
    }
}
