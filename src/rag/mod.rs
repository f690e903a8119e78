//! Retrieval-augmented answering over the statute corpus.

mod clean;
pub mod context;
mod response;

pub use clean::clean_output;
pub use context::{format_context_for_display, PromptComposer};
pub use response::{Answer, AnswerPipeline, DEGRADED_MESSAGE};

#[cfg(test)]
pub(crate) use response::tests::{pipeline_with, KeywordEmbedder};
