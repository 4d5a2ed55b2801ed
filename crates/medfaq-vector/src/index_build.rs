use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use medfaq_core::error::{Error, Result};
use medfaq_core::traits::Embedder;
use medfaq_core::types::FaqRecord;

use crate::cache;
use crate::flat::{normalize_l2, FlatIpIndex};
use crate::{CorpusSource, IndexedCorpus};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub batch_size: usize,
    pub show_progress: bool,
    /// Rebuild when the cached vector count differs from the dataset instead of
    /// only warning about it.
    pub validate_record_count: bool,
}

impl Default for BuildOptions {
    fn default() -> Self { Self { batch_size: 64, show_progress: false, validate_record_count: false } }
}

/// Returns the indexed corpus for `records`, reading it from `cache_dir` when both
/// artifacts are present and writing them there after a fresh build.
pub fn build_or_load(records: Vec<FaqRecord>, embedder: &dyn Embedder, cache_dir: &Path, opts: &BuildOptions) -> Result<IndexedCorpus> {
    let cached = cache::load(cache_dir).map_err(|e| Error::EmbeddingBuild(format!("cache read failed: {:#}", e)))?;
    if let Some(entry) = cached {
        let count_matches = entry.index.len() == records.len();
        if !count_matches {
            warn!(
                cached = entry.index.len(),
                records = records.len(),
                cache_dir = %cache_dir.display(),
                "embedding cache does not match the dataset size; delete the cache to rebuild"
            );
        }
        if entry.embedder_id != embedder.embedder_id() {
            warn!(cached = %entry.embedder_id, current = %embedder.embedder_id(), "embedding cache was built with a different embedder");
        }
        if count_matches || !opts.validate_record_count {
            info!(rows = entry.index.len(), cache_dir = %cache_dir.display(), "loaded embeddings from cache");
            return Ok(IndexedCorpus::from_parts(records, entry.vectors, entry.index, entry.embedder_id, CorpusSource::Cache));
        }
        info!("discarding stale embedding cache");
    }

    let start = Instant::now();
    let (vectors, index) = build_index(&records, embedder, opts)?;
    if vectors.is_empty() {
        warn!("dataset is empty; nothing to persist");
    } else {
        cache::save(cache_dir, &embedder.embedder_id(), &vectors, &index)
            .map_err(|e| Error::EmbeddingBuild(format!("cannot persist cache to {}: {:#}", cache_dir.display(), e)))?;
    }
    info!(rows = vectors.len(), dim = index.dim(), elapsed_ms = start.elapsed().as_millis() as u64, "embeddings created and saved");
    Ok(IndexedCorpus::from_parts(records, vectors, index, embedder.embedder_id(), CorpusSource::Built))
}

/// Encodes every record's `combined_text`, normalises the vectors and builds the
/// inner-product index. Nothing is read from or written to disk.
pub fn build_index(records: &[FaqRecord], embedder: &dyn Embedder, opts: &BuildOptions) -> Result<(Vec<Vec<f32>>, FlatIpIndex)> {
    let batch_size = opts.batch_size.max(1);
    let pb = if opts.show_progress { ProgressBar::new(records.len() as u64) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} FAQs ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(records.len());
    let mut dim: Option<usize> = None;
    for batch in records.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|r| r.combined_text.clone()).collect();
        let embedded = embedder.embed_batch(&texts).map_err(|e| Error::EmbeddingBuild(format!("embedder failed: {:#}", e)))?;
        if embedded.len() != texts.len() {
            return Err(Error::EmbeddingBuild(format!("embedder returned {} vectors for {} texts", embedded.len(), texts.len())));
        }
        for mut v in embedded {
            let row = vectors.len();
            let expected = *dim.get_or_insert(v.len());
            if v.len() != expected || expected == 0 {
                return Err(Error::EmbeddingBuild(format!("record {} has dimension {}, expected {}", row, v.len(), expected)));
            }
            if !normalize_l2(&mut v) {
                return Err(Error::EmbeddingBuild(format!("record {} produced a zero or non-finite vector", row)));
            }
            vectors.push(v);
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("done");

    let mut index = FlatIpIndex::new(dim.unwrap_or_else(|| embedder.dim()));
    for v in &vectors {
        index.add(v).map_err(Error::EmbeddingBuild)?;
    }
    Ok((vectors, index))
}
