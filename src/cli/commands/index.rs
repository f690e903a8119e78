//! Index command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::{embed_sections, read_parsed_dir, write_corpus};
use crate::orchestrator::load_embedder;
use anyhow::Result;

const BATCH_SIZE: usize = 32;

/// Run the index command.
pub async fn run_index(input: &str, output: Option<String>, settings: Settings) -> Result<()> {
    let input = Settings::expand_path(input);
    let output = output
        .map(|p| Settings::expand_path(&p))
        .unwrap_or_else(|| settings.corpus_path());

    let sections = match read_parsed_dir(&input) {
        Ok(sections) => sections,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };
    if sections.is_empty() {
        Output::warning(&format!("No sections with content found in {}", input.display()));
        return Ok(());
    }
    Output::info(&format!("Found {} sections with content", sections.len()));

    let spinner = Output::spinner("Loading embedding model...");
    let embedder = load_embedder(&settings);
    spinner.finish_and_clear();
    let embedder = embedder?;

    let total = sections.len() as u64;
    let pb = Output::progress_bar(total, "Embedding sections");
    let corpus = embed_sections(sections, embedder.as_ref(), BATCH_SIZE, |done| {
        pb.set_position(done as u64)
    })
    .await;
    pb.finish_and_clear();
    let corpus = corpus?;

    write_corpus(&output, &corpus)?;
    Output::success(&format!(
        "Saved {} embeddings to {}",
        corpus.len(),
        output.display()
    ));

    Ok(())
}
