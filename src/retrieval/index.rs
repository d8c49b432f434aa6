//! Brute-force cosine similarity index.

use std::sync::Arc;

use super::embedder::Embedder;
use crate::documents::Document;
use crate::providers::{ProviderError, Result};

pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Embed and index `documents`, preserving their order.
    pub async fn build(embedder: Arc<dyn Embedder>, documents: Vec<Document>) -> Result<Self> {
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(ProviderError::ParseError(format!(
                "{} embedder returned {} vectors for {} chunks",
                embedder.name(),
                vectors.len(),
                documents.len()
            )));
        }
        tracing::debug!(
            "Indexed {} chunk(s) with {} embedder",
            documents.len(),
            embedder.name()
        );

        Ok(Self {
            embedder,
            documents,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Top-`k` documents by cosine similarity; equal scores keep insertion order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        if k == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine(&query_vector, v)))
            .collect();
        // sort_by is stable, so ties stay in index order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.documents[i].clone())
            .collect())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
