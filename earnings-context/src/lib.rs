pub mod text;

pub use text::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TRANSCRIPT_SEPARATORS, TranscriptChunk,
    TranscriptSplitter,
};
