//! Local ONNX embedding inference via fastembed.
//!
//! The model is large enough that loading it per-call would be absurd, so
//! it lives behind a process-wide [`OnceLock`], matching the companion's
//! single-process deployment model.

use super::{EmbeddingClient, EmbeddingError, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Mutex, OnceLock};

/// Truncated output width after Matryoshka truncation of the underlying
/// model's native 768 dimensions.
pub const EMBEDDING_DIMENSIONS: usize = 384;

const MAX_TEXT_LENGTH: usize = 8192;
const BATCH_SIZE: usize = 32;

static MODEL: OnceLock<std::result::Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("MEMORY_CORE_EMBED_CACHE") {
        return std::path::PathBuf::from(path);
    }
    if let Some(dirs) = directories::ProjectDirs::from("com", "memory-core", "companion") {
        return dirs.cache_dir().join("fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

fn get_model() -> std::result::Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
    let result = MODEL.get_or_init(|| {
        let dir = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(error = %e, path = %dir.display(), "failed to create embedding cache dir");
        }
        let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
            .with_show_download_progress(false)
            .with_cache_dir(dir);
        TextEmbedding::try_new(options)
            .map(Mutex::new)
            .map_err(|e| format!("failed to initialize embedding model: {e}"))
    });

    match result {
        Ok(model) => model.lock().map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}"))),
        Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
    }
}

/// Truncate to [`EMBEDDING_DIMENSIONS`] and re-normalize to unit length —
/// valid because the underlying model was trained with Matryoshka
/// representation learning, so a prefix of the full vector is itself a
/// usable lower-dimensional embedding.
fn matryoshka_truncate(mut vector: Vec<f32>) -> Vec<f32> {
    if vector.len() > EMBEDDING_DIMENSIONS {
        vector.truncate(EMBEDDING_DIMENSIONS);
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// fastembed-backed [`EmbeddingClient`], feature-gated behind `embeddings`.
pub struct LocalEmbeddingClient;

impl LocalEmbeddingClient {
    pub fn new() -> Self {
        Self
    }

    /// Force model initialization (otherwise lazy on first `embed` call).
    pub fn warm_up(&self) -> Result<()> {
        get_model()?;
        Ok(())
    }
}

impl Default for LocalEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingClient for LocalEmbeddingClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("text cannot be empty".into()));
        }
        let mut model = get_model()?;
        let truncated = if text.len() > MAX_TEXT_LENGTH { &text[..MAX_TEXT_LENGTH] } else { text };

        let embeddings = model
            .embed(vec![truncated], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
        let first = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("no embedding generated".into()))?;
        Ok(matryoshka_truncate(first))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = get_model()?;
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            let truncated: Vec<&str> = chunk
                .iter()
                .map(|t| if t.len() > MAX_TEXT_LENGTH { &t[..MAX_TEXT_LENGTH] } else { *t })
                .collect();
            let embeddings = model
                .embed(truncated, None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
            out.extend(embeddings.into_iter().map(matryoshka_truncate));
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}
