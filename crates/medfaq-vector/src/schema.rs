//! On-disk layout of the persisted cache.
//!
//! A cache directory holds two artifacts:
//! - `faq_embeddings.safetensors`: the normalised vectors as one `[N, D]` f32 tensor
//! - `faq_index.json`: the serialised flat inner-product index plus a small header
use serde::{Deserialize, Serialize};

use crate::flat::FlatIpIndex;

pub const VECTORS_FILE: &str = "faq_embeddings.safetensors";
pub const INDEX_FILE: &str = "faq_index.json";
pub const VECTORS_TENSOR: &str = "embeddings";
pub const INDEX_FORMAT_VERSION: u32 = 1;
pub const METRIC_INNER_PRODUCT: &str = "inner_product";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFile {
    pub version: u32,
    pub metric: String,
    pub embedder_id: String,
    pub index: FlatIpIndex,
}
