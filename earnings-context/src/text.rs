//! Overlapping text chunking for earnings-call transcripts.
//!
//! Transcripts run tens of thousands of characters, far beyond what a single
//! embedding input can represent usefully, so they are cut into bounded,
//! overlapping windows before indexing. The splitter in this module prefers
//! natural boundaries: it first tries to cut between paragraphs, then lines,
//! then sentences, then words, and only chops mid-word when a piece of text
//! has no finer structure left. Consecutive windows share a configurable
//! overlap so that a statement straddling a window edge is still retrievable
//! from at least one chunk.
//!
//! The two main types are:
//! - [`TranscriptSplitter`]: configures separators, chunk size, and overlap,
//!   and produces chunks from a transcript.
//! - [`TranscriptChunk`]: one window of transcript text together with its
//!   provenance (`source`) and its byte start offset in the parent text.
//!
//! # Example
//!
//! ```
//! use earnings_context::text::TranscriptSplitter;
//!
//! let splitter = TranscriptSplitter::with_defaults();
//! let text = "Revenue grew nine percent. Margins expanded.\n\nGuidance was raised.";
//! let chunks = splitter.split("ACME_Q1_2025.json", text);
//!
//! assert_eq!(chunks.len(), 1); // short text fits in one window
//! assert_eq!(chunks[0].start_offset, 0);
//! assert_eq!(chunks[0].chunk_text, text);
//! ```
//!
//! Chunk invariants, for any input:
//! - no chunk is empty and no chunk exceeds the configured chunk size,
//! - start offsets are strictly increasing within one transcript,
//! - every byte of the input is covered by at least one chunk,
//! - adjacent chunks overlap by at most the configured overlap (exactly the
//!   configured overlap when the text splits at word granularity; less when
//!   the nearest natural boundary is coarser).
use regex::Regex;
use serde::Serialize;
use std::collections::VecDeque;
use std::ops::Range;

/// Default separator patterns for transcript prose, coarsest first.
///
/// - `\n\n`: paragraph breaks (speaker turns in most transcript formats)
/// - `\n`: line breaks
/// - `[.!?] `: sentence ends
/// - ` `: word boundaries, the finest natural separator
pub const DEFAULT_TRANSCRIPT_SEPARATORS: &[&str] = &[
    r"\n\n",    // Paragraphs / speaker turns
    r"\n",      // Line breaks
    r"[.!?] ",  // Sentence ends
    r" ",       // Words
];

/// Default maximum chunk length in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap carried between consecutive chunks, in bytes.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits transcript text into overlapping, provenance-tagged chunks.
///
/// Separators are regular expressions applied in order: the splitter cuts on
/// the first pattern, and only descends to the next pattern for pieces that
/// still exceed the chunk size. Pieces that exhaust every separator are cut
/// into raw character windows as a last resort, so no chunk ever exceeds
/// `chunk_size`.
pub struct TranscriptSplitter {
    separators: Vec<Regex>,
    chunk_size: usize,
    overlap: usize,
}

/// One window of transcript text.
///
/// Chunks carry the identifier of the transcript they were cut from and the
/// byte offset where their text begins in the parent, so a retrieved chunk
/// can always be traced back to its exact position in the original document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptChunk {
    /// Identifier of the parent transcript (typically the source filename).
    pub source: String,
    /// Position of this chunk within the parent's chunk sequence (0-indexed).
    pub sequence: usize,
    /// Byte offset of `chunk_text` within the parent text.
    pub start_offset: usize,
    /// The text content of this chunk.
    pub chunk_text: String,
}

impl TranscriptSplitter {
    /// Creates a splitter from explicit separator patterns and window policy.
    ///
    /// Separator patterns are applied in the order given, from most to least
    /// significant.
    ///
    /// # Panics
    ///
    /// Panics if any separator pattern is not a valid regular expression, or
    /// if `overlap >= chunk_size` (an overlap that large would never make
    /// forward progress).
    pub fn new(separator_patterns: &[&str], chunk_size: usize, overlap: usize) -> Self {
        assert!(
            overlap < chunk_size,
            "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
        );
        let separators = separator_patterns
            .iter()
            .map(|&pattern| Regex::new(pattern).unwrap())
            .collect();

        TranscriptSplitter {
            separators,
            chunk_size,
            overlap,
        }
    }

    /// Creates a splitter with the default transcript separators and the
    /// default 1000/200 window policy.
    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_TRANSCRIPT_SEPARATORS,
            DEFAULT_CHUNK_SIZE,
            DEFAULT_CHUNK_OVERLAP,
        )
    }

    /// Maximum chunk length in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap carried between consecutive chunks, in bytes.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into chunks tagged with `source`.
    ///
    /// The text is first segmented on natural boundaries, then segments are
    /// packed greedily into windows of at most `chunk_size` bytes. When a
    /// window is emitted, trailing segments totalling at most `overlap` bytes
    /// are retained to open the next window, so consecutive chunks share
    /// context across the cut.
    ///
    /// Empty input produces no chunks.
    pub fn split(&self, source: &str, text: &str) -> Vec<TranscriptChunk> {
        let segments = self.split_recursively_into_segments(text, 0, 0);

        let mut chunks: Vec<TranscriptChunk> = Vec::new();
        let mut window: VecDeque<Range<usize>> = VecDeque::new();
        let mut window_len = 0usize;

        for segment in segments {
            let segment_len = segment.end - segment.start;

            if window_len + segment_len > self.chunk_size && !window.is_empty() {
                self.emit_window(source, text, &window, &mut chunks);

                // Retain a tail of at most `overlap` bytes, and keep popping
                // while the incoming segment still would not fit.
                while window_len > self.overlap
                    || (window_len + segment_len > self.chunk_size && window_len > 0)
                {
                    let front = window.pop_front().expect("window is non-empty");
                    window_len -= front.end - front.start;
                }
            }

            window_len += segment_len;
            window.push_back(segment);
        }

        if !window.is_empty() {
            self.emit_window(source, text, &window, &mut chunks);
        }

        chunks
    }

    fn emit_window(
        &self,
        source: &str,
        text: &str,
        window: &VecDeque<Range<usize>>,
        chunks: &mut Vec<TranscriptChunk>,
    ) {
        let start = window.front().expect("window is non-empty").start;
        let end = window.back().expect("window is non-empty").end;
        chunks.push(TranscriptChunk {
            source: source.to_string(),
            sequence: chunks.len(),
            start_offset: start,
            chunk_text: text[start..end].to_string(),
        });
    }

    // Recursively splits the text into segments based on separators. Returns
    // byte ranges into the original text: pieces small enough to pack, plus
    // the separator matches themselves, so that consecutive ranges tile the
    // input without gaps.
    fn split_recursively_into_segments(
        &self,
        text: &str,
        separator_idx: usize,
        current_offset: usize,
    ) -> Vec<Range<usize>> {
        let mut result_segments: Vec<Range<usize>> = Vec::new();

        if text.is_empty() {
            return result_segments;
        }

        // Base case 1: the text already fits in a window.
        if text.len() <= self.chunk_size {
            result_segments.push(current_offset..(current_offset + text.len()));
            return result_segments;
        }

        // Base case 2: separators are exhausted but the text is still too
        // large, so cut raw character windows, snapped to char boundaries.
        if separator_idx >= self.separators.len() {
            let mut local_start = 0;
            while local_start < text.len() {
                let mut local_end = (local_start + self.chunk_size).min(text.len());
                while !text.is_char_boundary(local_end) {
                    local_end -= 1;
                }
                result_segments.push(current_offset + local_start..current_offset + local_end);
                local_start = local_end;
            }
            return result_segments;
        }

        let separator = &self.separators[separator_idx];
        let mut local_start = 0;

        for mat in separator.find_iter(text) {
            // The text before the separator, split further if still too big.
            if mat.start() > local_start {
                let sub_text = &text[local_start..mat.start()];
                result_segments.extend(self.split_recursively_into_segments(
                    sub_text,
                    separator_idx + 1,
                    current_offset + local_start,
                ));
            }
            // The separator itself is kept as a segment so that chunk text
            // reconstructs the original byte-for-byte.
            result_segments.push(current_offset + mat.start()..current_offset + mat.end());
            local_start = mat.end();
        }

        // Whatever remains after the last separator match.
        if local_start < text.len() {
            let sub_text = &text[local_start..];
            result_segments.extend(self.split_recursively_into_segments(
                sub_text,
                separator_idx + 1,
                current_offset + local_start,
            ));
        }

        result_segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage_is_complete(chunks: &[TranscriptChunk], text_len: usize) -> bool {
        if chunks.is_empty() {
            return text_len == 0;
        }
        if chunks[0].start_offset != 0 {
            return false;
        }
        let mut covered_to = 0usize;
        for chunk in chunks {
            if chunk.start_offset > covered_to {
                return false; // gap
            }
            covered_to = covered_to.max(chunk.start_offset + chunk.chunk_text.len());
        }
        covered_to == text_len
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let splitter = TranscriptSplitter::with_defaults();
        let text = "Good afternoon and welcome to the fourth quarter earnings call.";
        let chunks = splitter.split("ACME_Q4_2024.json", text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "ACME_Q4_2024.json");
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].chunk_text, text);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let splitter = TranscriptSplitter::with_defaults();
        assert!(splitter.split("ACME_Q4_2024.json", "").is_empty());
    }

    #[test]
    fn word_granular_text_overlaps_by_exactly_the_configured_amount() {
        // "a " repeated: every segment is a single byte, so windows fill to
        // exactly chunk_size and the retained tail is exactly the overlap.
        let splitter = TranscriptSplitter::with_defaults();
        let text = "a ".repeat(1750); // 3500 bytes
        let chunks = splitter.split("test.json", &text);

        assert_eq!(chunks.len(), 5);
        let starts: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(starts, vec![0, 800, 1600, 2400, 3200]);

        for chunk in &chunks[..4] {
            assert_eq!(chunk.chunk_text.len(), 1000);
        }
        assert_eq!(chunks[4].chunk_text.len(), 300); // the remainder

        for pair in chunks.windows(2) {
            let prev_end = pair[0].start_offset + pair[0].chunk_text.len();
            assert_eq!(prev_end - pair[1].start_offset, 200);
        }
        assert!(coverage_is_complete(&chunks, text.len()));
    }

    #[test]
    fn paragraphs_stay_whole_when_they_fit() {
        // Four paragraphs just under the window size: each lands in its own
        // chunk, and the overlap degrades to the paragraph separator because
        // a whole paragraph never fits inside the retained tail.
        let paragraph = |len: usize| "margin guidance remains unchanged ".repeat(30)[..len].to_string();
        let text = format!(
            "{}\n\n{}\n\n{}\n\n{}",
            paragraph(873),
            paragraph(873),
            paragraph(873),
            paragraph(875)
        );
        assert_eq!(text.len(), 3500);

        let splitter = TranscriptSplitter::with_defaults();
        let chunks = splitter.split("test.json", &text);

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert!(chunk.chunk_text.len() <= 1000);
            assert!(!chunk.chunk_text.is_empty());
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].start_offset < pair[1].start_offset);
            let prev_end = pair[0].start_offset + pair[0].chunk_text.len();
            let shared = prev_end.saturating_sub(pair[1].start_offset);
            assert!(shared <= 200);
        }
        assert!(coverage_is_complete(&chunks, text.len()));
    }

    #[test]
    fn long_text_produces_at_least_two_bounded_chunks() {
        let splitter = TranscriptSplitter::with_defaults();
        let text = "The company reported record deliveries this quarter. ".repeat(40);
        assert!(text.len() > DEFAULT_CHUNK_SIZE);

        let chunks = splitter.split("test.json", &text);

        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence, i);
            assert!(chunk.chunk_text.len() <= DEFAULT_CHUNK_SIZE);
            assert!(!chunk.chunk_text.is_empty());
        }
        let starts: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(starts, sorted, "offsets must be strictly increasing");
        assert!(coverage_is_complete(&chunks, text.len()));
    }

    #[test]
    fn separatorless_text_falls_back_to_character_windows() {
        let splitter = TranscriptSplitter::with_defaults();
        let text = "x".repeat(2500);
        let chunks = splitter.split("test.json", &text);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chunk_text.len() <= DEFAULT_CHUNK_SIZE);
        }
        assert!(coverage_is_complete(&chunks, text.len()));
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_character() {
        let splitter = TranscriptSplitter::new(DEFAULT_TRANSCRIPT_SEPARATORS, 100, 20);
        let text = "é".repeat(300); // 600 bytes, no separators at all
        let chunks = splitter.split("test.json", &text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chunk_text.chars().all(|c| c == 'é'));
        }
        assert!(coverage_is_complete(&chunks, text.len()));
    }

    #[test]
    #[should_panic(expected = "must be smaller than chunk size")]
    fn overlap_must_be_smaller_than_chunk_size() {
        TranscriptSplitter::new(DEFAULT_TRANSCRIPT_SEPARATORS, 100, 100);
    }
}
