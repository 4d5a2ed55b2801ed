//! Embedding index over the FAQ corpus.
//!
//! [`IndexedCorpus`] owns the records, their normalised vectors and the flat
//! inner-product index together, so row `i` of each always refers to the same FAQ.
use medfaq_core::types::FaqRecord;

pub mod cache;
pub mod flat;
pub mod index_build;
pub mod schema;
pub mod search;

pub use flat::FlatIpIndex;
pub use index_build::{build_index, build_or_load, BuildOptions};
pub use search::{Retriever, DEFAULT_TOP_K};

/// Where the vectors of an [`IndexedCorpus`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusSource {
    Built,
    Cache,
}

#[derive(Debug, Clone)]
pub struct IndexedCorpus {
    records: Vec<FaqRecord>,
    vectors: Vec<Vec<f32>>,
    index: FlatIpIndex,
    embedder_id: String,
    source: CorpusSource,
}

impl IndexedCorpus {
    pub(crate) fn from_parts(
        records: Vec<FaqRecord>,
        vectors: Vec<Vec<f32>>,
        index: FlatIpIndex,
        embedder_id: String,
        source: CorpusSource,
    ) -> Self {
        Self { records, vectors, index, embedder_id, source }
    }

    pub fn records(&self) -> &[FaqRecord] { &self.records }
    pub fn vectors(&self) -> &[Vec<f32>] { &self.vectors }
    pub fn index(&self) -> &FlatIpIndex { &self.index }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn source(&self) -> CorpusSource { self.source }

    /// `None` when `i` is past the end of the records, which happens when a stale
    /// cache holds more vectors than the dataset has rows.
    pub fn record(&self, i: usize) -> Option<&FaqRecord> { self.records.get(i) }

    /// Number of records, which is what the chat front end reports as total FAQs.
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Records, vectors and index rows all have the same count.
    pub fn is_synchronized(&self) -> bool {
        self.records.len() == self.vectors.len() && self.vectors.len() == self.index.len()
    }
}
