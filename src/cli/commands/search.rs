//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::load_corpus;
use crate::orchestrator::load_embedder;
use crate::retrieval::Retriever;
use anyhow::Result;
use std::sync::Arc;

/// Run the search command. Needs no completion credentials.
pub async fn run_search(query: &str, top_k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let top_k = settings.retrieval.resolve_top_k(top_k);

    let spinner = Output::spinner("Loading corpus and embedding model...");
    let loaded = load_corpus(&settings.corpus_path())
        .and_then(|corpus| Ok((corpus, load_embedder(&settings)?)));
    spinner.finish_and_clear();
    let (corpus, embedder) = loaded?;

    let retriever = Retriever::new(Arc::new(corpus), embedder)?;

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve(query, top_k).await;
    spinner.finish_and_clear();

    match results {
        Ok(sections) => {
            if sections.is_empty() {
                Output::warning("The corpus is empty.");
            } else {
                Output::success(&format!("Found {} sections", sections.len()));
                for section in &sections {
                    Output::section(
                        &section.entry.law_name,
                        &section.entry.title,
                        section.entry.chapter.as_deref(),
                        section.score,
                        &section.entry.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
