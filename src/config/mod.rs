//! Configuration module for LawDecoder.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    CompletionSettings, CorpusSettings, EmbeddingSettings, FeedbackSettings, GeneralSettings,
    PromptSettings, RetrievalSettings, ServerSettings, Settings,
};
