//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the ask command.
pub async fn run_ask(question: &str, top_k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'lawdecoder doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let top_k = settings.retrieval.resolve_top_k(top_k);

    let spinner = Output::spinner("Loading corpus and embedding model...");
    let orchestrator = Orchestrator::new(settings);
    spinner.finish_and_clear();
    let orchestrator = orchestrator?;
    let pipeline = orchestrator.pipeline();

    // Ctrl+C abandons in-flight completion attempts.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let spinner = Output::spinner("Consulting the statutes...");
    let result = pipeline.answer(question, top_k, &cancel).await;
    spinner.finish_and_clear();

    let answer = match result {
        Ok(answer) => answer,
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    };

    if answer.degraded {
        Output::warning(&answer.text);
    } else {
        println!("\n{}\n", answer.text);
        if let Some(model) = &answer.model {
            Output::kv("Model", model);
        }
    }

    if !answer.top_sections.is_empty() {
        Output::header("Relevant sections");
        for section in &answer.top_sections {
            Output::section(
                &section.entry.law_name,
                &section.entry.title,
                section.entry.chapter.as_deref(),
                section.score,
                &section.entry.content,
            );
        }
    }

    Ok(())
}
