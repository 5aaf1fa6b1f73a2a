//! Research pipeline and chat flows
//!
//! - [`ResearchEngine`]: query generation, grounded web research fan-out,
//!   reflection loop and answer finalization with restored citations
//! - [`DualModelChat`]: Gemini and SiliconFlow answer concurrently, then a
//!   third call merges both replies
//! - [`SingleModelChat`]: one call to the model configured for the chat stage

pub mod chat;
pub mod citations;
pub mod engine;
pub mod planner;
pub mod prompts;
pub mod searcher;
pub mod synthesizer;
pub mod types;

pub use chat::{DualModelChat, DualModelOutcome, ProcessingStage, SingleModelChat, SingleModelReply};
pub use citations::{
    get_citations, insert_citation_markers, resolve_urls, restore_short_urls, source_label,
    SHORT_URL_PREFIX,
};
pub use engine::{decide_next, ResearchEngine};
pub use planner::QueryPlanner;
pub use searcher::WebSearcher;
pub use synthesizer::AnswerSynthesizer;
pub use types::*;
