//! Persisted cache of vectors and index, keyed implicitly by the cache directory.
//!
//! There is no TTL and no content check against the dataset; a cache stays valid
//! until it is deleted. Artifacts are written to a temporary file and renamed
//! into place so a crashed build never leaves a half-written artifact behind.
use anyhow::{anyhow, ensure, Context, Result};
use candle_core::{DType, Device, Tensor};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::flat::FlatIpIndex;
use crate::schema::{IndexFile, INDEX_FILE, INDEX_FORMAT_VERSION, METRIC_INNER_PRODUCT, VECTORS_FILE, VECTORS_TENSOR};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub embedder_id: String,
    pub vectors: Vec<Vec<f32>>,
    pub index: FlatIpIndex,
}

pub fn vectors_path(cache_dir: &Path) -> PathBuf { cache_dir.join(VECTORS_FILE) }

pub fn index_path(cache_dir: &Path) -> PathBuf { cache_dir.join(INDEX_FILE) }

/// Both artifacts are present.
pub fn exists(cache_dir: &Path) -> bool { vectors_path(cache_dir).is_file() && index_path(cache_dir).is_file() }

/// Removes both artifacts if present. The directory itself is left in place.
pub fn clear(cache_dir: &Path) -> Result<()> {
    for path in [vectors_path(cache_dir), index_path(cache_dir)] {
        if path.exists() { fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?; }
    }
    Ok(())
}

/// Loads the cache. Returns `Ok(None)` when an artifact is missing, unreadable,
/// or the two artifacts disagree on shape; the caller then rebuilds.
pub fn load(cache_dir: &Path) -> Result<Option<CacheEntry>> {
    if !exists(cache_dir) { return Ok(None); }
    match read_artifacts(cache_dir) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) => {
            warn!(cache_dir = %cache_dir.display(), error = %e, "ignoring unusable embedding cache");
            Ok(None)
        }
    }
}

fn read_artifacts(cache_dir: &Path) -> Result<CacheEntry> {
    let vpath = vectors_path(cache_dir);
    let mut tensors = candle_core::safetensors::load(&vpath, &Device::Cpu).with_context(|| format!("read {}", vpath.display()))?;
    let tensor = tensors.remove(VECTORS_TENSOR).ok_or_else(|| anyhow!("{} has no '{}' tensor", vpath.display(), VECTORS_TENSOR))?;
    let vectors: Vec<Vec<f32>> = tensor.to_dtype(DType::F32)?.to_vec2()?;

    let ipath = index_path(cache_dir);
    let raw = fs::read_to_string(&ipath).with_context(|| format!("read {}", ipath.display()))?;
    let file: IndexFile = serde_json::from_str(&raw).with_context(|| format!("parse {}", ipath.display()))?;
    ensure!(file.version == INDEX_FORMAT_VERSION, "unsupported index format version {}", file.version);
    ensure!(file.metric == METRIC_INNER_PRODUCT, "unsupported metric '{}'", file.metric);
    ensure!(file.index.is_well_formed(), "index data length does not match its header");
    ensure!(
        vectors.len() == file.index.len(),
        "vector artifact has {} rows but index has {}",
        vectors.len(),
        file.index.len()
    );
    if let Some(first) = vectors.first() {
        ensure!(first.len() == file.index.dim(), "vector dim {} differs from index dim {}", first.len(), file.index.dim());
    }
    debug!(rows = vectors.len(), dim = file.index.dim(), "embedding cache read");
    Ok(CacheEntry { embedder_id: file.embedder_id, vectors, index: file.index })
}

/// Writes both artifacts, creating `cache_dir` if needed.
pub fn save(cache_dir: &Path, embedder_id: &str, vectors: &[Vec<f32>], index: &FlatIpIndex) -> Result<()> {
    ensure!(!vectors.is_empty(), "refusing to persist an empty corpus");
    fs::create_dir_all(cache_dir).with_context(|| format!("create {}", cache_dir.display()))?;

    let dim = index.dim();
    let flat: Vec<f32> = vectors.iter().flat_map(|v| v.iter().copied()).collect();
    ensure!(flat.len() == vectors.len() * dim, "vectors do not share the index dimension {}", dim);
    let tensor = Tensor::from_vec(flat, (vectors.len(), dim), &Device::Cpu)?;
    let mut tensors = HashMap::new();
    tensors.insert(VECTORS_TENSOR.to_string(), tensor);
    let vpath = vectors_path(cache_dir);
    let vtmp = vpath.with_extension("safetensors.tmp");
    candle_core::safetensors::save(&tensors, &vtmp).with_context(|| format!("write {}", vtmp.display()))?;
    fs::rename(&vtmp, &vpath).with_context(|| format!("rename {}", vtmp.display()))?;

    let file = IndexFile {
        version: INDEX_FORMAT_VERSION,
        metric: METRIC_INNER_PRODUCT.to_string(),
        embedder_id: embedder_id.to_string(),
        index: index.clone(),
    };
    let ipath = index_path(cache_dir);
    let itmp = ipath.with_extension("json.tmp");
    fs::write(&itmp, serde_json::to_vec(&file)?).with_context(|| format!("write {}", itmp.display()))?;
    fs::rename(&itmp, &ipath).with_context(|| format!("rename {}", itmp.display()))?;
    debug!(cache_dir = %cache_dir.display(), rows = vectors.len(), dim, "embedding cache written");
    Ok(())
}
