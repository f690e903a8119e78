//! Local feature-extraction embeddings via fastembed (ONNX runtime).

use super::{l2_normalize, Embedder};
use crate::error::{LawDecoderError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Supported local embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalModel {
    AllMiniLmL6V2,
    BgeSmallEnV15,
    BgeBaseEnV15,
    NomicEmbedTextV15,
}

impl LocalModel {
    pub fn dimensions(self) -> usize {
        match self {
            LocalModel::AllMiniLmL6V2 | LocalModel::BgeSmallEnV15 => 384,
            LocalModel::BgeBaseEnV15 | LocalModel::NomicEmbedTextV15 => 768,
        }
    }

    fn fastembed_model(self) -> EmbeddingModel {
        match self {
            LocalModel::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            LocalModel::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            LocalModel::BgeBaseEnV15 => EmbeddingModel::BGEBaseENV15,
            LocalModel::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
        }
    }
}

impl std::str::FromStr for LocalModel {
    type Err = LawDecoderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.to_lowercase();
        let name = name.rsplit('/').next().unwrap_or(&name);
        match name {
            "all-minilm-l6-v2" => Ok(LocalModel::AllMiniLmL6V2),
            "bge-small-en-v1.5" => Ok(LocalModel::BgeSmallEnV15),
            "bge-base-en-v1.5" => Ok(LocalModel::BgeBaseEnV15),
            "nomic-embed-text-v1.5" => Ok(LocalModel::NomicEmbedTextV15),
            _ => Err(LawDecoderError::Config(format!(
                "Unknown embedding model: {}",
                s
            ))),
        }
    }
}

/// Embedder backed by a locally cached ONNX model.
///
/// `TextEmbedding` needs exclusive access while running, and inference is
/// CPU-bound, so calls go through a mutex on the blocking thread pool.
pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    kind: LocalModel,
}

impl LocalEmbedder {
    /// Load the model once, downloading it into `cache_dir` on first use.
    #[instrument(skip_all, fields(model = ?kind))]
    pub fn load(kind: LocalModel, cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;

        let options = InitOptions::new(kind.fastembed_model())
            .with_cache_dir(cache_dir)
            .with_show_download_progress(false);

        let model = TextEmbedding::try_new(options)
            .map_err(|e| LawDecoderError::Embedding(format!("Failed to load model: {}", e)))?;

        info!("Loaded embedding model {:?}", kind);

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            kind,
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LawDecoderError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let model = self.model.clone();
        let input = texts.to_vec();

        let mut embeddings = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| LawDecoderError::Embedding("Embedding model lock poisoned".to_string()))?;
            guard
                .embed(input, None)
                .map_err(|e| LawDecoderError::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| LawDecoderError::Embedding(format!("Embedding task failed: {}", e)))??;

        for embedding in embeddings.iter_mut() {
            l2_normalize(embedding);
        }

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.kind.dimensions()
    }
}
