//! Embedding and nearest-neighbour search over chunks.

use std::sync::Arc;

pub mod embedder;
pub mod index;
pub mod local;

pub use embedder::{Embedder, HashingEmbedder, OllamaEmbedder};
pub use index::VectorIndex;
pub use local::FastEmbedEmbedder;

use crate::config::Settings;

/// Embedder factory.
pub fn create_embedder(settings: &Settings) -> Arc<dyn Embedder> {
    let retrieval = &settings.retrieval;
    match retrieval.embedder.as_str() {
        "ollama" => Arc::new(OllamaEmbedder::new(
            retrieval.ollama_url.clone(),
            retrieval.embedding_model.clone(),
        )),
        "hashing" => Arc::new(HashingEmbedder::new(retrieval.dimensions)),
        "fastembed" => local_embedder(settings),
        other => {
            tracing::warn!("Unknown embedder '{}', using fastembed", other);
            local_embedder(settings)
        }
    }
}

fn local_embedder(settings: &Settings) -> Arc<dyn Embedder> {
    let retrieval = &settings.retrieval;
    let cache_dir = retrieval.cache_dir.clone().or_else(|| {
        directories::ProjectDirs::from("com", "ragbus", "ragbus")
            .map(|dirs| dirs.cache_dir().join("fastembed"))
    });
    Arc::new(FastEmbedEmbedder::new(&retrieval.local_model, cache_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_picks_configured_embedder() {
        let mut settings = Settings::default();
        assert_eq!(create_embedder(&settings).name(), "fastembed");

        settings.retrieval.embedder = "hashing".to_string();
        assert_eq!(create_embedder(&settings).name(), "hashing");

        settings.retrieval.embedder = "ollama".to_string();
        assert_eq!(create_embedder(&settings).name(), "ollama");

        settings.retrieval.embedder = "faiss".to_string();
        assert_eq!(create_embedder(&settings).name(), "fastembed");
    }
}
