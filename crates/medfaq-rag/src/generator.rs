//! Grounded answer generation.
//!
//! Turns retrieved FAQ records into a single prompt, calls the generation
//! capability and post-processes the text. A generation failure never escapes
//! this module; it becomes [`GenerationOutcome::Degraded`].
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use medfaq_core::traits::Generator;
use medfaq_core::types::RetrievedDoc;

pub const DISCLAIMER: &str = "\n\n⚠️ Please consult with a healthcare professional for personalized medical advice.";

const PREAMBLE: &str = "You are a helpful medical assistant. Answer the user's question based on the provided medical context.\n\
Be accurate, clear, and helpful. If the context doesn't fully answer the question, say so and provide what information you can.";

const CLOSING: &str = "Please provide a clear, helpful answer based on the context above:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Model text, with the disclaimer appended when needed.
    Answered(String),
    /// The capability failed or returned nothing; carries the reason.
    Degraded(String),
}

pub fn build_prompt(query: &str, docs: &[RetrievedDoc]) -> String {
    let mut context = String::new();
    for (i, doc) in docs.iter().enumerate() {
        let _ = write!(context, "\nContext {} (Type: {}):\nQ: {}\nA: {}\n", i + 1, doc.category, doc.question, doc.answer);
    }
    format!("{PREAMBLE}\n\nContext from medical knowledge base:\n{context}\n\nUser Question: {query}\n\n{CLOSING}")
}

/// Appends [`DISCLAIMER`] unless the text already mentions "consult" or "doctor".
pub fn with_disclaimer(answer: String) -> String {
    let lower = answer.to_lowercase();
    if lower.contains("consult") || lower.contains("doctor") {
        answer
    } else {
        answer + DISCLAIMER
    }
}

#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn Generator>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn Generator>) -> Self { Self { llm } }

    pub fn generate(&self, query: &str, docs: &[RetrievedDoc]) -> GenerationOutcome {
        let prompt = build_prompt(query, docs);
        let start = Instant::now();
        match self.llm.generate(&prompt) {
            Ok(text) if text.trim().is_empty() => {
                warn!("generation returned an empty answer");
                GenerationOutcome::Degraded("the model returned an empty answer".to_string())
            }
            Ok(text) => {
                debug!(context_docs = docs.len(), elapsed_ms = start.elapsed().as_millis() as u64, "answer generated");
                GenerationOutcome::Answered(with_disclaimer(text))
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                GenerationOutcome::Degraded(format!("{:#}", e))
            }
        }
    }
}

/// Shortens `text` to `max_chars` characters, adding `...` when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(category: &str, question: &str, answer: &str) -> RetrievedDoc {
        RetrievedDoc { category: category.into(), question: question.into(), answer: answer.into(), score: 0.9 }
    }

    #[test]
    fn prompt_lists_each_context_block_in_order() {
        let prompt = build_prompt(
            "Is asthma curable?",
            &[doc("information", "What is asthma?", "A chronic airway disease."), doc("treatment", "How is asthma treated?", "Inhalers.")],
        );
        let first = prompt.find("Context 1 (Type: information):\nQ: What is asthma?\nA: A chronic airway disease.").unwrap();
        let second = prompt.find("Context 2 (Type: treatment):\nQ: How is asthma treated?\nA: Inhalers.").unwrap();
        let question = prompt.find("User Question: Is asthma curable?").unwrap();
        assert!(prompt.starts_with("You are a helpful medical assistant."));
        assert!(first < second && second < question);
        assert!(prompt.ends_with(CLOSING));
    }

    #[test]
    fn prompt_without_context_still_carries_the_question() {
        let prompt = build_prompt("hello", &[]);
        assert!(!prompt.contains("Context 1"));
        assert!(prompt.contains("User Question: hello"));
    }

    #[test]
    fn disclaimer_is_skipped_when_a_doctor_is_mentioned() {
        assert_eq!(with_disclaimer("Ask your Doctor.".into()), "Ask your Doctor.");
        assert_eq!(with_disclaimer("Please CONSULT a nurse.".into()), "Please CONSULT a nurse.");
        assert_eq!(with_disclaimer("Drink water.".into()), format!("Drink water.{}", DISCLAIMER));
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        assert_eq!(preview("short", 300), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
