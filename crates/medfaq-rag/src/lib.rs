//! Answer generation and the chat entry point on top of a [`Retrieve`] seam.
//!
//! [`Retrieve`]: medfaq_core::traits::Retrieve
pub mod chat;
pub mod gemini;
pub mod generator;

pub use chat::{degraded_answer, ChatBot, EMPTY_QUERY_ANSWER};
pub use gemini::GeminiGenerator;
pub use generator::{build_prompt, preview, with_disclaimer, AnswerGenerator, GenerationOutcome, DISCLAIMER};
