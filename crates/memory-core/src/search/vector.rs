//! Approximate nearest-neighbor index over memory embeddings.
//!
//! Backed by USearch's HNSW graph. Keys are memory ids (strings); USearch
//! itself only speaks `u64`, so the index keeps a bidirectional mapping
//! alongside it.

use std::collections::HashMap;
use std::path::Path;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

pub const DEFAULT_DIMENSIONS: usize = 384;
pub const DEFAULT_CONNECTIVITY: usize = 16;
pub const DEFAULT_EXPANSION_ADD: usize = 128;
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VectorSearchError {
    #[error("index creation failed: {0}")]
    IndexCreation(String),
    #[error("failed to add vector: {0}")]
    IndexAdd(String),
    #[error("search failed: {0}")]
    IndexSearch(String),
    #[error("persistence failed: {0}")]
    IndexPersistence(String),
    #[error("invalid dimensions: expected {0}, got {1}")]
    InvalidDimensions(usize, usize),
}

pub type Result<T> = std::result::Result<T, VectorSearchError>;

#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    pub dimensions: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
    pub metric: MetricKind,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            metric: MetricKind::Cos,
        }
    }
}

/// Memory-id-keyed HNSW index. `add` is idempotent on a repeated id
/// (remove then re-insert under the same internal u64).
pub struct VectorIndex {
    index: Index,
    config: VectorIndexConfig,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    next_id: u64,
}

impl VectorIndex {
    pub fn new() -> Result<Self> {
        Self::with_config(VectorIndexConfig::default())
    }

    pub fn with_config(config: VectorIndexConfig) -> Result<Self> {
        let index = Self::build_index(&config)?;
        Ok(Self {
            index,
            config,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            next_id: 0,
        })
    }

    fn build_index(config: &VectorIndexConfig) -> Result<Index> {
        let options = IndexOptions {
            dimensions: config.dimensions,
            metric: config.metric,
            quantization: ScalarKind::F32,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false,
        };
        Index::new(&options).map_err(|e| VectorSearchError::IndexCreation(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn ensure_capacity(&self) -> Result<()> {
        let size = self.index.size();
        let capacity = self.index.capacity();
        if size >= capacity {
            let new_capacity = std::cmp::max(capacity * 2, 16);
            self.index
                .reserve(new_capacity)
                .map_err(|e| VectorSearchError::IndexCreation(e.to_string()))?;
        }
        Ok(())
    }

    /// Insert or overwrite the vector for `key`. Constant amortized time.
    pub fn add(&mut self, key: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(self.config.dimensions, vector.len()));
        }

        if let Some(&existing_id) = self.key_to_id.get(key) {
            self.index
                .remove(existing_id)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            self.ensure_capacity()?;
            self.index
                .add(existing_id, vector)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            return Ok(());
        }

        self.ensure_capacity()?;
        let id = self.next_id;
        self.next_id += 1;
        self.index
            .add(id, vector)
            .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
        self.key_to_id.insert(key.to_string(), id);
        self.id_to_key.insert(id, key.to_string());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<bool> {
        if let Some(id) = self.key_to_id.remove(key) {
            self.id_to_key.remove(&id);
            self.index
                .remove(id)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_to_id.contains_key(key)
    }

    /// `(id, similarity)` ranked descending, similarity normalized to
    /// `[0, 1]`. Never errors on an empty index — returns an empty list.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(String, f32)>> {
        if query.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(self.config.dimensions, query.len()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(query, limit)
            .map_err(|e| VectorSearchError::IndexSearch(e.to_string()))?;

        let mut results = Vec::with_capacity(matches.keys.len());
        for (id, distance) in matches.keys.iter().zip(matches.distances.iter()) {
            if let Some(key) = self.id_to_key.get(id) {
                let similarity = (1.0 - distance).clamp(0.0, 1.0);
                results.push((key.clone(), similarity));
            }
        }
        Ok(results)
    }

    /// Atomic save: write to a sibling temp file, then rename. The u64 id
    /// map is saved alongside as a `.mappings.json` sidecar.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let tmp_str = tmp_path
            .to_str()
            .ok_or_else(|| VectorSearchError::IndexPersistence("non-utf8 path".into()))?;

        self.index.save(tmp_str).map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        std::fs::rename(&tmp_path, path).map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;

        let mappings_path = path.with_extension("mappings.json");
        let mappings = serde_json::json!({
            "key_to_id": self.key_to_id,
            "next_id": self.next_id,
        });
        let mappings_tmp = mappings_path.with_extension("mappings.json.tmp");
        std::fs::write(
            &mappings_tmp,
            serde_json::to_string(&mappings).map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?,
        )
        .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        std::fs::rename(&mappings_tmp, &mappings_path)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;

        Ok(())
    }

    /// Load from disk. A corrupted or missing index file yields a fresh
    /// empty index rather than an error — the caller logs and continues.
    pub fn load(path: &Path, config: VectorIndexConfig) -> Self {
        match Self::try_load(path, &config) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "vector index load failed, starting empty");
                Self::with_config(config).expect("default index config is always valid")
            }
        }
    }

    fn try_load(path: &Path, config: &VectorIndexConfig) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| VectorSearchError::IndexPersistence("non-utf8 path".into()))?;
        let index = Self::build_index(config)?;
        index.load(path_str).map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;

        let mappings_path = path.with_extension("mappings.json");
        let mappings_str = std::fs::read_to_string(&mappings_path)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        let mappings: serde_json::Value =
            serde_json::from_str(&mappings_str).map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;

        let key_to_id: HashMap<String, u64> = serde_json::from_value(mappings["key_to_id"].clone())
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))?;
        let next_id = mappings["next_id"]
            .as_u64()
            .ok_or_else(|| VectorSearchError::IndexPersistence("missing next_id".into()))?;
        let id_to_key = key_to_id.iter().map(|(k, &v)| (v, k.clone())).collect();

        Ok(Self {
            index,
            config: config.clone(),
            key_to_id,
            id_to_key,
            next_id,
        })
    }
}
