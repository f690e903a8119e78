//! Configuration settings for LawDecoder.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub completion: CompletionSettings,
    pub feedback: FeedbackSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lawdecoder".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Precomputed statute vector corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Path to the JSON vector file produced by `lawdecoder index`.
    pub path: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            path: "~/.lawdecoder/parsed_laws_vectors.json".to_string(),
        }
    }
}

/// Local embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model name (all-MiniLM-L6-v2, bge-small-en-v1.5, ...).
    pub model: String,
    /// Directory where model weights are cached.
    pub cache_dir: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            cache_dir: "~/.lawdecoder/models".to_string(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of sections used as context when the caller does not say.
    pub top_k: usize,
    /// Upper bound on a caller-supplied result count.
    pub max_top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: crate::retrieval::DEFAULT_TOP_K,
            max_top_k: 20,
        }
    }
}

impl RetrievalSettings {
    /// Resolve a caller-supplied result count against the configured bounds.
    pub fn resolve_top_k(&self, requested: Option<usize>) -> usize {
        let max = self.max_top_k.max(1);
        requested.unwrap_or(self.top_k).clamp(1, max)
    }
}

/// Chat completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// Candidate models, tried in order.
    pub models: Vec<String>,
    /// Environment variable prefix for numbered API keys (PREFIX1, PREFIX2, ...).
    pub credential_prefix: String,
    /// Timeout for a single HTTP attempt, in seconds.
    pub attempt_timeout_secs: u64,
    /// Tries per (model, credential) pair on timeouts and network failures.
    pub max_tries: u32,
    /// Overall budget for one completion across every model and credential, in seconds.
    pub deadline_secs: u64,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            models: vec![
                "qwen/qwen3-4b:free".to_string(),
                "qwen/qwen3-235b-a22b:free".to_string(),
                "google/gemini-2.0-flash-exp:free".to_string(),
                "deepseek/deepseek-r1-0528:free".to_string(),
            ],
            credential_prefix: "OPENROUTER_API_KEY".to_string(),
            attempt_timeout_secs: 50,
            max_tries: 4,
            deadline_secs: 180,
            temperature: 0.15,
        }
    }
}

impl CompletionSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Overall deadline; zero disables it.
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }
}

/// Feedback log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// Path to the append-only JSON-lines feedback file.
    pub path: String,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            path: "~/.lawdecoder/feedback.jsonl".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LawDecoderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lawdecoder")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    pub fn corpus_path(&self) -> PathBuf {
        Self::expand_path(&self.corpus.path)
    }

    pub fn model_cache_dir(&self) -> PathBuf {
        Self::expand_path(&self.embedding.cache_dir)
    }

    pub fn feedback_path(&self) -> PathBuf {
        Self::expand_path(&self.feedback.path)
    }
}
