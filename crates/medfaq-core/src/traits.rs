use crate::error::Result;
use crate::types::RetrievedDoc;

/// Text → vector capability. Every vector returned for one embedder must have
/// the same dimensionality, and identical input must yield identical output.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Stable identifier for the model behind this embedder (e.g. `minilm:d384`).
    fn embedder_id(&self) -> String { format!("anonymous:d{}", self.dim()) }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Prompt → text capability, usually a remote LLM. May fail on transport,
/// auth or quota problems.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Query → ranked documents. Implemented by the vector retriever; the chat
/// layer only depends on this seam.
pub trait Retrieve: Send + Sync {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDoc>>;
    /// Size of the searchable knowledge base.
    fn total_records(&self) -> usize;
}
