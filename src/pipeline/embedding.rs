use std::sync::Arc;

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Embedding generation service using rust-bert.
/// This runs on CPU.
#[derive(Clone)]
pub struct EmbeddingService {
    model: Arc<Mutex<SentenceEmbeddingsModel>>,
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("model", &"<SentenceEmbeddingsModel>")
            .finish()
    }
}

impl EmbeddingService {
    /// Initialize the embedding model. This might take a while to download
    /// the model on first run.
    pub fn new() -> Result<Self> {
        // Model construction is blocking and heavy; do it off the async runtime.
        let model = std::thread::spawn(|| {
            SentenceEmbeddingsBuilder::remote(SentenceEmbeddingsModelType::AllMiniLmL12V2)
                .create_model()
        })
        .join()
        .map_err(|_| anyhow::anyhow!("failed to join model creation thread"))??;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }

    /// Generate embeddings for a batch of topic titles.
    pub async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let texts_clone = texts.to_vec();

        let result = tokio::task::spawn_blocking(move || {
            let model = model.blocking_lock();
            model.encode(&texts_clone)
        })
        .await
        .context("failed to join embedding task");

        match result {
            Ok(Ok(embeddings)) => {
                let mut valid_embeddings = Vec::with_capacity(embeddings.len());
                let mut fallback_count = 0;

                for (i, embedding) in embeddings.into_iter().enumerate() {
                    let norm: f32 = embedding.iter().map(|x| x * x).sum();
                    if norm.abs() < 1e-6 {
                        valid_embeddings.push(Self::fallback_embedding(&texts[i]));
                        fallback_count += 1;
                    } else {
                        valid_embeddings.push(embedding);
                    }
                }

                if fallback_count > 0 {
                    warn!(
                        fallback_count,
                        total_count = texts.len(),
                        "generated fallback embeddings due to zero-norm output"
                    );
                }

                Ok(valid_embeddings)
            }
            Ok(Err(e)) => {
                warn!(error = ?e, "embedding model failed, using fallback for all texts");
                Ok(texts.iter().map(|t| Self::fallback_embedding(t)).collect())
            }
            Err(e) => {
                warn!(error = ?e, "embedding task failed, using fallback for all texts");
                Ok(texts.iter().map(|t| Self::fallback_embedding(t)).collect())
            }
        }
    }

    /// Deterministic fallback embedding derived from an MD5 digest, used
    /// when the model is unavailable or produces a degenerate vector so
    /// clustering still has something stable to compare against.
    fn fallback_embedding(text: &str) -> Vec<f32> {
        let digest = md5::compute(text);
        let mut seed = [0u8; 32];
        for (i, &byte) in digest.iter().enumerate() {
            seed[i] = byte;
            seed[i + 16] = byte;
        }

        let mut rng = StdRng::from_seed(seed);
        // AllMiniLmL12V2 dimension is 384.
        let mut embedding = Vec::with_capacity(384);
        for _ in 0..384 {
            embedding.push(rng.gen_range(-1.0..1.0));
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }

        embedding
    }
}

/// Cosine similarity between two embedding vectors; 0.0 if either is zero-norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_similarity_zero_norm_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }
}
