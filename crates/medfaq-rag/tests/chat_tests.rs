use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tempfile::TempDir;

use medfaq_core::error::{Error, Result};
use medfaq_core::traits::{Generator, Retrieve};
use medfaq_core::types::{FaqRecord, RetrievedDoc};
use medfaq_embed::FakeEmbedder;
use medfaq_rag::{degraded_answer, AnswerGenerator, ChatBot, GenerationOutcome, DISCLAIMER, EMPTY_QUERY_ANSWER};
use medfaq_vector::{build_or_load, BuildOptions, Retriever};

struct StubRetriever {
    calls: AtomicUsize,
    docs: Vec<RetrievedDoc>,
    fail: bool,
}

impl StubRetriever {
    fn returning(docs: Vec<RetrievedDoc>) -> Self { Self { calls: AtomicUsize::new(0), docs, fail: false } }
    fn failing() -> Self { Self { calls: AtomicUsize::new(0), docs: Vec::new(), fail: true } }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Retrieve for StubRetriever {
    fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<RetrievedDoc>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Retrieval("index unavailable".to_string()));
        }
        Ok(self.docs.iter().take(top_k).cloned().collect())
    }

    fn total_records(&self) -> usize { self.docs.len() }
}

/// Replies with a canned answer (or error) and remembers the last prompt.
struct StubLlm {
    calls: AtomicUsize,
    reply: std::result::Result<String, String>,
    last_prompt: Mutex<Option<String>>,
}

impl StubLlm {
    fn ok(text: &str) -> Self { Self { calls: AtomicUsize::new(0), reply: Ok(text.to_string()), last_prompt: Mutex::new(None) } }
    fn err(msg: &str) -> Self { Self { calls: AtomicUsize::new(0), reply: Err(msg.to_string()), last_prompt: Mutex::new(None) } }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    fn last_prompt(&self) -> Option<String> { self.last_prompt.lock().unwrap().clone() }
}

impl Generator for StubLlm {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.reply.clone().map_err(|m| anyhow!(m))
    }
}

fn doc(question: &str, score: f32) -> RetrievedDoc {
    RetrievedDoc { category: "symptoms".into(), question: question.into(), answer: format!("Answer to {}", question), score }
}

fn bot(retriever: Arc<StubRetriever>, llm: Arc<StubLlm>) -> ChatBot { ChatBot::new(retriever, AnswerGenerator::new(llm), 3) }

#[test]
fn blank_query_short_circuits_before_any_capability() {
    let retriever = Arc::new(StubRetriever::returning(vec![doc("a", 0.9)]));
    let llm = Arc::new(StubLlm::ok("never used"));
    let chatbot = bot(retriever.clone(), llm.clone());

    for query in ["", "   ", "\n\t"] {
        let response = chatbot.chat(query);
        assert_eq!(response.answer, EMPTY_QUERY_ANSWER);
        assert!(response.relevant_docs.is_empty());
        assert_eq!(response.sources_used, 0);
        assert_eq!(response.query, query);
    }
    assert_eq!(retriever.calls(), 0);
    assert_eq!(llm.calls(), 0);
}

#[test]
fn answered_response_carries_all_sources() {
    let retriever = Arc::new(StubRetriever::returning(vec![doc("a", 0.9), doc("b", 0.7), doc("c", 0.5), doc("d", 0.1)]));
    let llm = Arc::new(StubLlm::ok("See a doctor if symptoms persist."));
    let response = bot(retriever, llm.clone()).chat("What are the symptoms of flu?");

    assert_eq!(response.answer, "See a doctor if symptoms persist.");
    assert_eq!(response.sources_used, 3);
    assert_eq!(response.relevant_docs.len(), response.sources_used);
    assert_eq!(response.relevant_docs[0].question, "a");

    let prompt = llm.last_prompt().unwrap();
    assert!(prompt.contains("User Question: What are the symptoms of flu?"));
    assert!(prompt.contains("Context 3 (Type: symptoms):\nQ: c\nA: Answer to c"));
    assert!(!prompt.contains("Q: d"));
}

#[test]
fn disclaimer_is_appended_only_when_missing() {
    let retriever = Arc::new(StubRetriever::returning(vec![doc("a", 0.9)]));
    let plain = bot(retriever.clone(), Arc::new(StubLlm::ok("Drink plenty of fluids."))).chat("cold?");
    assert_eq!(plain.answer, format!("Drink plenty of fluids.{}", DISCLAIMER));

    let consult = bot(retriever, Arc::new(StubLlm::ok("Please Consult your pharmacist."))).chat("cold?");
    assert_eq!(consult.answer, "Please Consult your pharmacist.");
}

#[test]
fn generation_failure_still_yields_a_response_with_sources() {
    let retriever = Arc::new(StubRetriever::returning(vec![doc("a", 0.9), doc("b", 0.8)]));
    let response = bot(retriever, Arc::new(StubLlm::err("401 unauthorized"))).chat("What is diabetes?");

    assert_eq!(response.answer, degraded_answer("401 unauthorized"));
    assert!(response.answer.starts_with("Sorry, I couldn't generate an answer right now. Error: 401 unauthorized"));
    assert!(response.answer.ends_with("Please check your GEMINI API key and try again."));
    assert_eq!(response.sources_used, 2);
}

#[test]
fn blank_generation_is_degraded() {
    let generator = AnswerGenerator::new(Arc::new(StubLlm::ok("  \n ")));
    match generator.generate("q", &[doc("a", 0.9)]) {
        GenerationOutcome::Degraded(reason) => assert!(!reason.is_empty()),
        other => panic!("expected a degraded outcome, got {other:?}"),
    }
}

#[test]
fn answered_outcome_is_not_degraded() {
    let generator = AnswerGenerator::new(Arc::new(StubLlm::ok("Rest.")));
    assert_eq!(generator.generate("q", &[]), GenerationOutcome::Answered(format!("Rest.{}", DISCLAIMER)));
}

#[test]
fn retrieval_failure_becomes_an_error_answer() {
    let retriever = Arc::new(StubRetriever::failing());
    let llm = Arc::new(StubLlm::ok("unused"));
    let response = bot(retriever.clone(), llm.clone()).chat("What is asthma?");

    assert!(response.answer.starts_with("Sorry, I encountered an error while processing your question:"));
    assert!(response.answer.contains("index unavailable"));
    assert!(response.relevant_docs.is_empty());
    assert_eq!(response.sources_used, 0);
    assert_eq!(retriever.calls(), 1);
    assert_eq!(llm.calls(), 0);
}

#[test]
fn end_to_end_over_a_real_index() {
    let tmp = TempDir::new().unwrap();
    let records = vec![
        FaqRecord::new("symptoms", "What are the symptoms of diabetes?", "Increased thirst and frequent urination."),
        FaqRecord::new("prevention", "How can I prevent the flu?", "Get a yearly flu vaccine."),
        FaqRecord::new("information", "What is asthma?", "A chronic disease of the airways."),
    ];
    let embedder = Arc::new(FakeEmbedder::new(64));
    let corpus = Arc::new(build_or_load(records, embedder.as_ref(), tmp.path(), &BuildOptions::default()).unwrap());
    let retriever = Arc::new(Retriever::new(corpus, embedder));
    let llm = Arc::new(StubLlm::ok("Get vaccinated every year."));
    let chatbot = ChatBot::new(retriever, AnswerGenerator::new(llm.clone()), 2);

    let response = chatbot.chat("how do I prevent the flu");
    assert_eq!(chatbot.total_faqs(), 3);
    assert_eq!(response.sources_used, 2);
    assert_eq!(response.relevant_docs[0].category, "prevention");
    assert!(llm.last_prompt().unwrap().contains("Q: How can I prevent the flu?"));
}
