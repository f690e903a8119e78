//! Startup wiring for LawDecoder.
//!
//! Loads every long-lived resource once (corpus, embedding model, credential
//! pool, prompts) and fails fast if any of them is missing.

use crate::completion::{client_from_settings, CompletionClient};
use crate::config::{Prompts, Settings};
use crate::corpus::{load_corpus, Corpus};
use crate::embedding::{Embedder, LocalEmbedder, LocalModel};
use crate::error::Result;
use crate::feedback::FeedbackLog;
use crate::rag::{AnswerPipeline, PromptComposer};
use std::sync::Arc;
use tracing::{info, instrument};

/// Shared, process-wide components.
pub struct Orchestrator {
    pipeline: Arc<AnswerPipeline>,
    feedback: Arc<FeedbackLog>,
}

impl Orchestrator {
    /// Load everything needed to serve queries.
    #[instrument(skip_all)]
    pub fn new(settings: Settings) -> Result<Self> {
        let completion = client_from_settings(&settings.completion)?;
        info!(
            "Completion: {} models, {} credentials",
            completion.models().models().len(),
            completion.credential_count()
        );

        let corpus = Arc::new(load_corpus(&settings.corpus_path())?);
        let embedder = load_embedder(&settings)?;

        Self::with_components(settings, corpus, embedder, completion)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        corpus: Arc<Corpus>,
        embedder: Arc<dyn Embedder>,
        completion: CompletionClient,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let pipeline = AnswerPipeline::new(
            corpus,
            embedder,
            PromptComposer::new(prompts),
            completion,
        )?;
        let feedback = FeedbackLog::new(settings.feedback_path());

        Ok(Self {
            pipeline: Arc::new(pipeline),
            feedback: Arc::new(feedback),
        })
    }

    pub fn pipeline(&self) -> Arc<AnswerPipeline> {
        self.pipeline.clone()
    }

    pub fn feedback(&self) -> Arc<FeedbackLog> {
        self.feedback.clone()
    }
}

/// Load the configured local embedding model.
pub fn load_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let model: LocalModel = settings.embedding.model.parse()?;
    let embedder = LocalEmbedder::load(model, settings.model_cache_dir())?;
    Ok(Arc::new(embedder))
}
