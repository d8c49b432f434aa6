//! In-process sentence embeddings via fastembed (ONNX runtime).

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::embedder::Embedder;
use crate::providers::{ProviderError, Result};

pub const DEFAULT_MODEL: &str = "BAAI/bge-small-en-v1.5";

/// Local embedding model, downloaded on first use and kept loaded.
pub struct FastEmbedEmbedder {
    model: EmbeddingModel,
    cache_dir: Option<PathBuf>,
    inner: Arc<Mutex<Option<TextEmbedding>>>,
}

impl FastEmbedEmbedder {
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Self {
        Self {
            model: parse_model(model_name),
            cache_dir,
            inner: Arc::new(Mutex::new(None)),
        }
    }
}

/// Map a Hugging Face model id to a fastembed model, defaulting to BGE-small.
pub fn parse_model(name: &str) -> EmbeddingModel {
    match name {
        "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "sentence-transformers/all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
        other => {
            tracing::warn!("Unknown embedding model '{}', using {}", other, DEFAULT_MODEL);
            EmbeddingModel::BGESmallENV15
        }
    }
}

#[async_trait]
impl Embedder for FastEmbedEmbedder {
    fn name(&self) -> &str {
        "fastembed"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts = texts.to_vec();
        let inner = Arc::clone(&self.inner);
        let model = self.model.clone();
        let cache_dir = self.cache_dir.clone();

        // Model load and inference are CPU-bound.
        tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let mut guard = inner
                .lock()
                .map_err(|_| ProviderError::other("embedding model lock poisoned"))?;

            if guard.is_none() {
                tracing::info!("Loading embedding model {:?}", model);
                let mut options = InitOptions::new(model).with_show_download_progress(false);
                if let Some(dir) = cache_dir {
                    options = options.with_cache_dir(dir);
                }
                let loaded = TextEmbedding::try_new(options).map_err(|e| {
                    ProviderError::NotAvailable(format!("embedding model failed to load: {}", e))
                })?;
                *guard = Some(loaded);
            }

            let model = guard
                .as_mut()
                .ok_or_else(|| ProviderError::other("embedding model not loaded"))?;
            model
                .embed(texts, None)
                .map_err(|e| ProviderError::Other(format!("embedding failed: {}", e)))
        })
        .await
        .map_err(|e| ProviderError::Other(format!("embedding task failed: {}", e)))?
    }
}
