//! The answer pipeline: embed, rank, compose, complete, clean.

use super::clean::clean_output;
use super::context::{format_context_for_display, PromptComposer};
use crate::completion::{CompletionClient, CompletionOutcome};
use crate::corpus::Corpus;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::retrieval::{Retriever, ScoredEntry};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Returned in place of an answer when no model could produce one.
pub const DEGRADED_MESSAGE: &str = "All AI models failed. Please try again later.";

/// Result of one question.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Ranked sections used as context, highest score first.
    pub top_sections: Vec<ScoredEntry>,
    /// Cleaned model output, or `DEGRADED_MESSAGE`.
    pub text: String,
    /// True when generation failed and only retrieval results are meaningful.
    pub degraded: bool,
    /// Model that produced the answer.
    pub model: Option<String>,
}

/// Composes embedding, ranking, prompting and completion.
pub struct AnswerPipeline {
    retriever: Retriever,
    composer: PromptComposer,
    completion: CompletionClient,
}

impl AnswerPipeline {
    /// Create a pipeline. The corpus and embedder must agree on dimension.
    pub fn new(
        corpus: Arc<Corpus>,
        embedder: Arc<dyn Embedder>,
        composer: PromptComposer,
        completion: CompletionClient,
    ) -> Result<Self> {
        Ok(Self {
            retriever: Retriever::new(corpus, embedder)?,
            composer,
            completion,
        })
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer a question.
    ///
    /// Retrieval failures are errors. Generation failures are not: the
    /// retrieved sections come back with `DEGRADED_MESSAGE` and `degraded`.
    #[instrument(skip(self, cancel), fields(query = %query))]
    pub async fn answer(
        &self,
        query: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        info!("Processing query");

        let top_sections = self.retriever.retrieve(query, top_k).await?;
        debug!("Context sections:\n{}", format_context_for_display(&top_sections));
        let query = query.trim();
        let system_prompt = self.composer.compose(query, &top_sections);

        match self.completion.complete(&system_prompt, query, cancel).await {
            CompletionOutcome::Completed { text, model } => Ok(Answer {
                top_sections,
                text: clean_output(&text),
                degraded: false,
                model: Some(model),
            }),
            outcome => {
                warn!("Generation failed ({:?}); returning retrieval results only", outcome);
                Ok(Answer {
                    top_sections,
                    text: DEGRADED_MESSAGE.to_string(),
                    degraded: true,
                    model: None,
                })
            }
        }
    }
}
