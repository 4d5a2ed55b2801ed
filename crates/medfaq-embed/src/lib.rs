use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use medfaq_core::config::{DevicePreference, EmbeddingBackend, EmbeddingConfig};
use medfaq_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

const BERT_PAD_ID: u32 = 0;

/// Sentence embedder for BERT-family checkpoints such as all-MiniLM-L6-v2.
///
/// Expects `config.json`, `tokenizer.json` and `model.safetensors` in the model
/// directory. Output vectors are masked-mean pooled and L2-normalised.
pub struct MiniLmEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize, id: String }

impl MiniLmEmbedder {
    pub fn load(model_dir: &Path, max_len: usize, preference: DevicePreference) -> Result<Self> {
        let device = device::select_device(preference)?;
        info!(model_dir = %model_dir.display(), "loading sentence embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("read {}", config_path.display()))?,
        )
        .with_context(|| format!("parse {}", config_path.display()))?;
        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(anyhow!("model weights not found at {}", weights_path.display()));
        }
        // SAFETY: the weights file is memory-mapped read-only and not modified while the model lives.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)? };
        let model = BertModel::load(vb, &config)?;
        let dim = config.hidden_size;
        let max_len = max_len.min(config.max_position_embeddings);
        let name = model_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "bert".to_string());
        let id = format!("local:{}:d{}", name, dim);
        info!(dim, max_len, embedder = %id, "sentence embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_batch_on_device(&self.tokenizer, texts, self.max_len, BERT_PAD_ID, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(rows)
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embedder_id(&self) -> String { self.id.clone() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        self.embed_chunk(texts)
    }
}

/// Deterministic bag-of-words embedder: each lower-cased alphanumeric token is
/// hashed into one of `dim` buckets. Fast and model-free, for tests and dev.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn bucket(&self, token: &str) -> (usize, f32) {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut hasher = XxHash64::with_seed(0);
        token.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h as usize) % self.dim;
        let val = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        (idx, val)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lower = text.to_lowercase();
        let mut seen_token = false;
        for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let (idx, val) = self.bucket(token);
            v[idx] += val;
            seen_token = true;
        }
        if !seen_token {
            let (idx, val) = self.bucket(&lower);
            v[idx] += val;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embedder_id(&self) -> String { format!("fake:xxhash:d{}", self.dim) }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_text(t)).collect()) }
}

/// Builds the embedder selected by configuration.
pub fn get_default_embedder(config: &EmbeddingConfig, model_dir: &Path) -> Result<Arc<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Fake => {
            warn!(dim = config.fake_dim, "using FakeEmbedder; retrieval quality is lexical only");
            Ok(Arc::new(FakeEmbedder::new(config.fake_dim)))
        }
        EmbeddingBackend::Minilm => Ok(Arc::new(MiniLmEmbedder::load(model_dir, config.max_len, config.device)?)),
    }
}

/// Euclidean norm of `v`.
pub fn l2_norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_only_text_still_gets_a_unit_vector() {
        let e = FakeEmbedder::new(16);
        let v = e.embed_batch(&["???".to_string()]).unwrap().remove(0);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn fake_embedder_is_case_insensitive() {
        let e = FakeEmbedder::new(32);
        let out = e.embed_batch(&["Diabetes Symptoms".to_string(), "diabetes symptoms".to_string()]).unwrap();
        assert_eq!(out[0], out[1]);
    }

    #[test]
    fn zero_dimension_is_clamped_to_one() {
        let e = FakeEmbedder::new(0);
        assert_eq!(e.dim(), 1);
        assert_eq!(e.embedder_id(), "fake:xxhash:d1");
        let out = e.embed_batch(&["fever".to_string(), "".to_string()]).unwrap();
        for v in &out {
            assert_eq!(v.len(), 1);
            assert!((l2_norm(v) - 1.0).abs() < 1e-5);
        }
    }
}
