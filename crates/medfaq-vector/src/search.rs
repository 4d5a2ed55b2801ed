use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use medfaq_core::error::{Error, Result};
use medfaq_core::traits::{Embedder, Retrieve};
use medfaq_core::types::RetrievedDoc;

use crate::flat::normalize_l2;
use crate::IndexedCorpus;

pub const DEFAULT_TOP_K: usize = 3;

/// Nearest-neighbour lookup of FAQ records for a free-text query.
#[derive(Clone)]
pub struct Retriever {
    corpus: Arc<IndexedCorpus>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(corpus: Arc<IndexedCorpus>, embedder: Arc<dyn Embedder>) -> Self { Self { corpus, embedder } }

    pub fn corpus(&self) -> &IndexedCorpus { &self.corpus }

    /// Returns at most `top_k` records ordered by descending cosine similarity.
    /// Ties keep insertion order. Index hits without a matching record are skipped.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDoc>> {
        let index = self.corpus.index();
        if index.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let mut query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| Error::Retrieval(format!("query embedding failed: {:#}", e)))?
            .pop()
            .ok_or_else(|| Error::Retrieval("embedder returned no vector for the query".to_string()))?;
        if query_vec.len() != index.dim() {
            return Err(Error::Retrieval(format!(
                "query vector has dimension {}, index expects {}",
                query_vec.len(),
                index.dim()
            )));
        }
        if !normalize_l2(&mut query_vec) {
            return Err(Error::Retrieval("query produced a zero or non-finite vector".to_string()));
        }

        let mut docs = Vec::with_capacity(top_k.min(index.len()));
        for (id, score) in index.search(&query_vec, top_k) {
            match self.corpus.record(id) {
                Some(record) => docs.push(RetrievedDoc::from_record(record, score)),
                None => warn!(id, records = self.corpus.len(), "index hit has no matching record; skipping"),
            }
        }
        debug!(top_k, hits = docs.len(), elapsed_ms = start.elapsed().as_millis() as u64, "retrieval done");
        Ok(docs)
    }
}

impl Retrieve for Retriever {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDoc>> { Retriever::retrieve(self, query, top_k) }

    fn total_records(&self) -> usize { self.corpus.len() }
}
