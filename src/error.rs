//! Error types for LawDecoder.

use thiserror::Error;

/// Library-level error type for LawDecoder operations.
#[derive(Error, Debug)]
pub enum LawDecoderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Feedback store error: {0}")]
    Feedback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl LawDecoderError {
    /// Whether the error was caused by the caller's input rather than the service.
    pub fn is_validation(&self) -> bool {
        matches!(self, LawDecoderError::Validation(_))
    }
}

/// Result type alias for LawDecoder operations.
pub type Result<T> = std::result::Result<T, LawDecoderError>;
