//! Serialization of retrieval results into grounding context.
//!
//! The serialized text block is the exact payload a downstream answer layer
//! injects into its language-model context. The structured match list rides
//! along with it (dual output) so a caller can cite sources without parsing
//! the formatted text back apart.

use super::retriever::{RetrievalResult, ScoredChunk};
use serde::Serialize;

/// Marker emitted when a query matched nothing, so downstream consumers can
/// distinguish "no relevant context" from a retrieval failure.
pub const NO_CONTEXT_MARKER: &str = "No relevant context found.";

/// A retrieval result serialized for a language model, plus the structured
/// matches it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct GroundingContext {
    /// The formatted text block to place in the model's context.
    pub context: String,
    /// The ranked matches backing the text, for citation.
    pub matches: Vec<ScoredChunk>,
}

impl GroundingContext {
    /// Serialize a retrieval result into its dual text/structured form.
    pub fn from_result(result: RetrievalResult) -> Self {
        let context = serialize_matches(&result.matches);
        Self {
            context,
            matches: result.matches,
        }
    }
}

/// Format ranked matches as one text block: per chunk, its provenance and
/// content, blocks separated by a blank line.
pub fn serialize_matches(matches: &[ScoredChunk]) -> String {
    if matches.is_empty() {
        return NO_CONTEXT_MARKER.to_string();
    }

    matches
        .iter()
        .map(|chunk| format!("Source: {}\nContent: {}", chunk.source, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(source: &str, content: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            source: source.to_string(),
            ticker: None,
            quarter: None,
            year: None,
            start_offset: 0,
            content: content.to_string(),
            score,
        }
    }

    #[test]
    fn matches_serialize_in_rank_order_with_provenance() {
        let result = RetrievalResult {
            matches: vec![
                scored("RIVN_Q4_2025.json", "R2 remains on schedule.", 0.91),
                scored("RIVN_Q4_2025.json", "Capex guidance is unchanged.", 0.78),
            ],
        };

        let grounding = GroundingContext::from_result(result);
        assert_eq!(
            grounding.context,
            "Source: RIVN_Q4_2025.json\nContent: R2 remains on schedule.\n\n\
             Source: RIVN_Q4_2025.json\nContent: Capex guidance is unchanged."
        );
        // Dual output: the structured matches survive alongside the text.
        assert_eq!(grounding.matches.len(), 2);
        assert!(grounding.matches[0].score > grounding.matches[1].score);
    }

    #[test]
    fn empty_result_produces_the_explicit_marker() {
        let grounding = GroundingContext::from_result(RetrievalResult::default());
        assert_eq!(grounding.context, NO_CONTEXT_MARKER);
        assert!(grounding.matches.is_empty());
    }
}
