//! Query pipeline: question in, ranked and serialized grounding context out.

pub mod filter;
pub mod retriever;
pub mod serializer;

pub use filter::{FilterCondition, MetadataFilter};
pub use retriever::{
    DEFAULT_TOP_K, RetrievalRequest, RetrievalResult, Retriever, ScoredChunk,
};
pub use serializer::{GroundingContext, NO_CONTEXT_MARKER, serialize_matches};
