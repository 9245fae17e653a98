//! Structured metadata extraction from transcript source identifiers.
//!
//! Transcript files follow the naming convention `TICKER_Qn_YYYY…` (e.g.
//! `RIVN_Q4_2025.json`), which encodes the company ticker, fiscal quarter,
//! and fiscal year. The extractor here is deliberately lenient: a filename
//! that does not follow the convention degrades metadata richness, never
//! ingestion success — the record is kept with only its provenance.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::warn;

/// `TICKER_Qn_YYYY` at the start of the identifier: one or more uppercase
/// letters, a quarter Q1..Q4, and exactly four digits.
static SOURCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)_(Q[1-4])_(\d{4})").unwrap());

/// Structured metadata parsed from a source identifier.
///
/// Either all three fields are present (the identifier matched the naming
/// convention) or all three are absent. Fields are never defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub ticker: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<i64>,
}

impl SourceMetadata {
    /// `true` when no field was parsed from the identifier.
    pub fn is_empty(&self) -> bool {
        self.ticker.is_none() && self.quarter.is_none() && self.year.is_none()
    }
}

/// Extracts ticker, quarter, and year from a source identifier.
///
/// On a match, returns the ticker and quarter exactly as written (the
/// pattern only admits uppercase) and the year as an integer. On no match,
/// logs a warning and returns the empty metadata — never an error.
pub fn extract_source_metadata(source: &str) -> SourceMetadata {
    match parse_source(source) {
        Some(metadata) => metadata,
        None => {
            warn!("Could not extract standard metadata from filename: {source}");
            SourceMetadata::default()
        }
    }
}

fn parse_source(source: &str) -> Option<SourceMetadata> {
    let caps = SOURCE_PATTERN.captures(source)?;
    let year: i64 = caps[3].parse().ok()?;
    Some(SourceMetadata {
        ticker: Some(caps[1].to_string()),
        quarter: Some(caps[2].to_string()),
        year: Some(year),
    })
}
