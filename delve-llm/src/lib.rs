//! Model clients for Delve
//!
//! [`ChatModel`] is the seam every pipeline talks to. [`ProviderModelFactory`]
//! builds siumai-backed handles for Gemini and SiliconFlow, and
//! [`GeminiSearchClient`] runs Google Search grounded generation.

pub mod factory;
pub mod grounding;
pub mod model;
pub mod structured;

pub use factory::{ModelFactory, ModelRequest, ProviderModelFactory};
pub use grounding::{
    Candidate, Content, GeminiSearchClient, GroundedResponse, GroundedSearch, GroundingChunk,
    GroundingMetadata, GroundingSupport, Part, Segment, WebSource,
};
pub use model::{ChatModel, SiumaiChatModel};
pub use structured::{extract_json, generate_json};
