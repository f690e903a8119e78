//! Pre-flight checks before expensive operations.
//!
//! Validates that required files and credentials are available before
//! loading the embedding model or binding a port. Indexing validates its
//! input directory itself.

use crate::completion::CredentialPool;
use crate::config::Settings;
use crate::error::{LawDecoderError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Serving and asking need credentials and the corpus.
    Answer,
    /// Search needs the corpus only.
    Search,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Answer => {
            check_credentials(settings)?;
            check_corpus(settings)?;
        }
        Operation::Search => {
            check_corpus(settings)?;
        }
    }
    Ok(())
}

/// Check that at least one completion credential is configured.
pub fn check_credentials(settings: &Settings) -> Result<usize> {
    CredentialPool::from_env(&settings.completion.credential_prefix).map(|pool| pool.len())
}

/// Check that the corpus vector file exists.
pub fn check_corpus(settings: &Settings) -> Result<()> {
    let path = settings.corpus_path();
    if path.is_file() {
        Ok(())
    } else {
        Err(LawDecoderError::Config(format!(
            "Corpus file {} not found. Build it with: lawdecoder index <parsed_dir>",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_corpus_fails_search() {
        let mut settings = Settings::default();
        settings.corpus.path = "/nonexistent/vectors.json".to_string();
        assert!(matches!(
            check(Operation::Search, &settings),
            Err(LawDecoderError::Config(_))
        ));
    }

    #[test]
    fn test_existing_corpus_passes_search() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut settings = Settings::default();
        settings.corpus.path = file.path().display().to_string();
        assert!(check(Operation::Search, &settings).is_ok());
    }
}
