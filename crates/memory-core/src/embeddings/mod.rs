//! Embedding generation seam.
//!
//! `HybridRetriever` and `VectorizeQueue` depend only on [`EmbeddingClient`];
//! the `embeddings` feature supplies a local ONNX implementation, but a
//! caller can swap in a remote API client without touching retrieval code.

#[cfg(feature = "embeddings")]
mod local;

#[cfg(feature = "embeddings")]
pub use local::LocalEmbeddingClient;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("model initialization failed: {0}")]
    ModelInit(String),
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Text-to-vector embedding, owned by whoever needs semantic search.
pub trait EmbeddingClient: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize;
}

/// Deterministic hash-based embedding for tests that need an
/// `EmbeddingClient` without the `embeddings` feature or a network call.
pub struct MockEmbeddingClient {
    dimensions: usize,
}

impl MockEmbeddingClient {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl EmbeddingClient for MockEmbeddingClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("text cannot be empty".into()));
        }
        use std::hash::{Hash, Hasher};
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, word) in text.split_whitespace().enumerate() {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            word.hash(&mut hasher);
            let slot = (hasher.finish() as usize + i) % self.dimensions;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
