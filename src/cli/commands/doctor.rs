//! Doctor command - verify credentials, corpus and embedding model.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::load_corpus;
use crate::orchestrator::load_embedder;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
///
/// Loading the embedding model here also downloads it into the cache, so a
/// passing doctor run leaves the service ready to start offline.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("LawDecoder Doctor");
    println!();
    println!("Checking configuration, credentials, corpus and embedding model...\n");

    let mut checks = Vec::new();

    println!("{}", style("Completion").bold());
    let completion_checks = vec![check_credentials(settings), check_models(settings)];
    for check in &completion_checks {
        check.print();
    }
    checks.extend(completion_checks);

    println!();

    println!("{}", style("Corpus").bold());
    let (corpus_check, corpus_dimension) = check_corpus(settings);
    corpus_check.print();
    checks.push(corpus_check);

    println!();

    println!("{}", style("Embedding Model").bold());
    let embedding_check = check_embedding_model(settings, corpus_dimension);
    embedding_check.print();
    checks.push(embedding_check);

    println!();

    println!("{}", style("Files").bold());
    let file_checks = vec![
        check_data_dir(settings),
        check_feedback_log(settings),
        check_config_file(),
    ];
    for check in &file_checks {
        check.print();
    }
    checks.extend(file_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before serving queries.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! LawDecoder is ready to use.");
    }

    Ok(())
}

fn check_credentials(settings: &Settings) -> CheckResult {
    let prefix = &settings.completion.credential_prefix;
    let name = format!("{}<N>", prefix);
    match preflight::check_credentials(settings) {
        Ok(1) => CheckResult::warning(
            &name,
            "1 credential configured",
            "Add more keys to spread rate limits across accounts",
        ),
        Ok(count) => CheckResult::ok(&name, &format!("{} credentials configured", count)),
        Err(_) => CheckResult::error(
            &name,
            "no credentials found",
            &format!("Set with: export {}1='sk-or-...'", prefix),
        ),
    }
}

fn check_models(settings: &Settings) -> CheckResult {
    let models: Vec<&str> = settings
        .completion
        .models
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();
    if models.is_empty() {
        CheckResult::error(
            "Models",
            "no models configured",
            "Add model ids to [completion] models in the config file",
        )
    } else {
        CheckResult::ok("Models", &models.join(" → "))
    }
}

/// Returns the corpus dimension when the corpus loads.
fn check_corpus(settings: &Settings) -> (CheckResult, Option<usize>) {
    let path = settings.corpus_path();
    if !path.exists() {
        return (
            CheckResult::error(
                "Vector file",
                &format!("{} not found", path.display()),
                "Build it with: lawdecoder index <parsed_dir>",
            ),
            None,
        );
    }

    match load_corpus(&path) {
        Ok(corpus) if corpus.is_empty() => (
            CheckResult::warning(
                "Vector file",
                &format!("{} (empty)", path.display()),
                "Every query will return no sections",
            ),
            None,
        ),
        Ok(corpus) => (
            CheckResult::ok(
                "Vector file",
                &format!(
                    "{} sections, dimension {}, {}",
                    corpus.len(),
                    corpus.dimension().unwrap_or_default(),
                    file_size(&path)
                ),
            ),
            corpus.dimension(),
        ),
        Err(e) => (
            CheckResult::error(
                "Vector file",
                &format!("failed to load: {}", e),
                "Rebuild it with: lawdecoder index <parsed_dir>",
            ),
            None,
        ),
    }
}

fn check_embedding_model(settings: &Settings, corpus_dimension: Option<usize>) -> CheckResult {
    let name = &settings.embedding.model;
    match load_embedder(settings) {
        Ok(embedder) => match corpus_dimension {
            Some(dim) if dim != embedder.dimensions() => CheckResult::error(
                name,
                &format!(
                    "produces {} dimensions but the corpus has {}",
                    embedder.dimensions(),
                    dim
                ),
                "Re-index the corpus with this model or configure the model it was built with",
            ),
            _ => CheckResult::ok(
                name,
                &format!(
                    "loaded ({} dimensions, cache {})",
                    embedder.dimensions(),
                    settings.model_cache_dir().display()
                ),
            ),
        },
        Err(e) => CheckResult::error(
            name,
            &format!("failed to load: {}", e),
            "Check network access for the first download, or [embedding] cache_dir",
        ),
    }
}

fn check_data_dir(settings: &Settings) -> CheckResult {
    let data_dir = settings.data_dir();
    if data_dir.exists() {
        CheckResult::ok("Data directory", &format!("{}", data_dir.display()))
    } else {
        CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        )
    }
}

fn check_feedback_log(settings: &Settings) -> CheckResult {
    let path = settings.feedback_path();
    if path.exists() {
        CheckResult::ok(
            "Feedback log",
            &format!("{} ({})", path.display(), file_size(&path)),
        )
    } else {
        CheckResult::ok(
            "Feedback log",
            &format!("{} (created on first feedback)", path.display()),
        )
    }
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: lawdecoder config init",
        )
    }
}

fn file_size(path: &Path) -> String {
    std::fs::metadata(path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string())
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
