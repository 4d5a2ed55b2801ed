//! Domain types shared by the loader, the index and the chat layer.

use serde::{Deserialize, Serialize};

/// Category used when the source has no category column or the value is blank.
pub const DEFAULT_CATEGORY: &str = "General";

/// One knowledge-base entry.
///
/// - `category`: the `qtype` of the source row, or [`DEFAULT_CATEGORY`]
/// - `question`/`answer`: non-empty text taken verbatim from the source
/// - `combined_text`: `question + " " + answer`, the only text that gets embedded
///
/// The position of a record inside the loaded sequence is its identity for
/// every downstream vector and index slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub category: String,
    pub question: String,
    pub answer: String,
    pub combined_text: String,
}

impl FaqRecord {
    pub fn new(category: impl Into<String>, question: impl Into<String>, answer: impl Into<String>) -> Self {
        let question = question.into();
        let answer = answer.into();
        let combined_text = format!("{} {}", question, answer);
        Self { category: category.into(), question, answer, combined_text }
    }
}

/// A record matched by a query, together with its raw inner-product score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDoc {
    pub category: String,
    pub question: String,
    pub answer: String,
    pub score: f32,
}

impl RetrievedDoc {
    pub fn from_record(record: &FaqRecord, score: f32) -> Self {
        Self {
            category: record.category.clone(),
            question: record.question.clone(),
            answer: record.answer.clone(),
            score,
        }
    }
}

/// The result of one chat call. `sources_used` always equals `relevant_docs.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub query: String,
    pub answer: String,
    pub relevant_docs: Vec<RetrievedDoc>,
    pub sources_used: usize,
}

impl ChatResponse {
    /// A terminal response that carries no sources.
    pub fn without_sources(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { query: query.into(), answer: answer.into(), relevant_docs: Vec::new(), sources_used: 0 }
    }

    pub fn with_sources(query: impl Into<String>, answer: impl Into<String>, relevant_docs: Vec<RetrievedDoc>) -> Self {
        let sources_used = relevant_docs.len();
        Self { query: query.into(), answer: answer.into(), relevant_docs, sources_used }
    }
}
