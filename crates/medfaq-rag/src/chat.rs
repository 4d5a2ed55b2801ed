use std::sync::Arc;

use tracing::{error, info};

use medfaq_core::traits::Retrieve;
use medfaq_core::types::ChatResponse;

use crate::generator::{AnswerGenerator, GenerationOutcome};

pub const EMPTY_QUERY_ANSWER: &str = "Please ask a medical question and I'll help you find relevant information.";

/// Text shown in place of an answer when generation degraded.
pub fn degraded_answer(reason: &str) -> String {
    format!("Sorry, I couldn't generate an answer right now. Error: {}\n\nPlease check your GEMINI API key and try again.", reason)
}

/// Query entry point: retrieve, then generate. Every call yields a
/// [`ChatResponse`]; retrieval and generation problems end up in `answer`.
#[derive(Clone)]
pub struct ChatBot {
    retriever: Arc<dyn Retrieve>,
    generator: AnswerGenerator,
    top_k: usize,
}

impl ChatBot {
    pub fn new(retriever: Arc<dyn Retrieve>, generator: AnswerGenerator, top_k: usize) -> Self {
        Self { retriever, generator, top_k: top_k.max(1) }
    }

    /// Number of FAQ records the bot can answer from.
    pub fn total_faqs(&self) -> usize { self.retriever.total_records() }

    pub fn chat(&self, query: &str) -> ChatResponse {
        if query.trim().is_empty() {
            return ChatResponse::without_sources(query, EMPTY_QUERY_ANSWER);
        }

        let docs = match self.retriever.retrieve(query, self.top_k) {
            Ok(docs) => docs,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return ChatResponse::without_sources(
                    query,
                    format!("Sorry, I encountered an error while processing your question: {}", e),
                );
            }
        };
        info!(hits = docs.len(), "retrieved context");

        let answer = match self.generator.generate(query, &docs) {
            GenerationOutcome::Answered(text) => text,
            GenerationOutcome::Degraded(reason) => degraded_answer(&reason),
        };
        ChatResponse::with_sources(query, answer, docs)
    }
}
