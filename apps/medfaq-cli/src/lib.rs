//! Start-up wiring and text rendering shared by the `medfaq-*` binaries.
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use medfaq_core::config::{EmbeddingBackend, Settings};
use medfaq_core::data_processor::DataProcessor;
use medfaq_core::traits::Embedder;
use medfaq_core::types::ChatResponse;
use medfaq_embed::get_default_embedder;
use medfaq_rag::{preview, AnswerGenerator, ChatBot, GeminiGenerator};
use medfaq_vector::{build_or_load, BuildOptions, IndexedCorpus};

pub const QUIT_WORDS: [&str; 3] = ["quit", "exit", "bye"];

pub const SOURCE_PREVIEW_CHARS: usize = 300;

pub static SAMPLE_QUESTIONS: [(&str, &[&str]); 2] = [
    (
        "🩺 Symptoms & Diagnosis",
        &[
            "What are the early symptoms of diabetes?",
            "How is hypertension diagnosed?",
            "What causes chest pain?",
            "Signs of heart disease?",
        ],
    ),
    (
        "💊 Treatment & Medication",
        &[
            "Can children take paracetamol?",
            "What foods are good for heart health?",
            "How to treat a common cold?",
            "Natural remedies for headaches?",
        ],
    ),
];

pub const MEDICAL_DISCLAIMER: &str = "⚠️  Medical Disclaimer: This chatbot is for informational purposes only. \
The information provided is not a substitute for professional medical advice, diagnosis, or treatment. \
Always seek the advice of your physician or other qualified health provider with any questions you may have \
regarding a medical condition.";

/// Overrides shared by every binary; unset flags keep the configured value.
#[derive(Args, Debug, Default, Clone)]
pub struct CommonArgs {
    /// FAQ CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Directory holding the embedding cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// Use the hashing embedder instead of the MiniLM model
    #[arg(long)]
    pub fake_embeddings: bool,
}

impl CommonArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(csv) = &self.csv { settings.data.csv_path = csv.to_string_lossy().into_owned(); }
        if let Some(dir) = &self.cache_dir { settings.cache.dir = dir.to_string_lossy().into_owned(); }
        if self.fake_embeddings { settings.embedding.backend = EmbeddingBackend::Fake; }
    }
}

/// `RUST_LOG` wins; otherwise `info`. Logs go to stderr so stdout stays readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).try_init().ok();
}

pub fn load_settings(args: &CommonArgs) -> Result<Settings> {
    let mut settings = Settings::load().context("load configuration")?;
    args.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

pub fn build_options(settings: &Settings) -> BuildOptions {
    BuildOptions {
        batch_size: settings.embedding.batch_size,
        show_progress: settings.embedding.show_progress,
        validate_record_count: settings.cache.validate_record_count,
    }
}

/// Loads the dataset, the embedder and the indexed corpus (from cache when possible).
pub fn load_corpus(settings: &Settings) -> Result<(Arc<dyn Embedder>, Arc<IndexedCorpus>)> {
    let records = DataProcessor::with_config(settings.loader_config()).load_csv(&settings.csv_path())?;
    let embedder = get_default_embedder(&settings.embedding, &settings.model_dir())
        .with_context(|| format!("load embedder from {}", settings.model_dir().display()))?;
    let corpus = build_or_load(records, embedder.as_ref(), &settings.cache_dir(), &build_options(settings))?;
    info!(faqs = corpus.len(), source = ?corpus.source(), "knowledge base ready");
    Ok((embedder, Arc::new(corpus)))
}

pub fn build_chatbot(settings: &Settings, embedder: Arc<dyn Embedder>, corpus: Arc<IndexedCorpus>) -> Result<ChatBot> {
    let gemini = GeminiGenerator::new(&settings.generation, settings.api_key())?;
    if !gemini.has_api_key() {
        warn!("GEMINI_API_KEY is not set; answers will only report the missing key");
    }
    let retriever = Arc::new(medfaq_vector::Retriever::new(corpus, embedder));
    Ok(ChatBot::new(retriever, AnswerGenerator::new(Arc::new(gemini)), settings.retrieval.top_k))
}

pub fn is_quit(input: &str) -> bool {
    let input = input.trim();
    QUIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

/// Sample questions in display order, numbered from 1.
pub fn sample_questions() -> impl Iterator<Item = &'static str> {
    SAMPLE_QUESTIONS.iter().flat_map(|(_, questions)| questions.iter().copied())
}

/// A bare number picks the matching sample question; anything else is the query itself.
pub fn resolve_input(input: &str) -> String {
    let trimmed = input.trim();
    trimmed
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| sample_questions().nth(i))
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

pub fn render_samples() -> String {
    let mut out = String::from("💡 Try asking questions like (type a number to pick one):\n");
    let mut n = 0;
    for (title, questions) in SAMPLE_QUESTIONS.iter() {
        let _ = writeln!(out, "\n{}", title);
        for q in questions.iter() {
            n += 1;
            let _ = writeln!(out, "  {}. {}", n, q);
        }
    }
    out
}

pub fn render_response(response: &ChatResponse) -> String {
    let mut out = format!("{}\n\nSources used: {}\n", response.answer, response.sources_used);
    for (i, doc) in response.relevant_docs.iter().enumerate() {
        let _ = write!(
            out,
            "\nSource {} (Type: {}, Relevance: {:.3})\nQ: {}\nA: {}\n",
            i + 1,
            doc.category,
            doc.score,
            doc.question,
            preview(&doc.answer, SOURCE_PREVIEW_CHARS)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use medfaq_core::types::RetrievedDoc;

    #[test]
    fn quit_words_ignore_case_and_padding() {
        assert!(is_quit("quit"));
        assert!(is_quit("  EXIT \n"));
        assert!(is_quit("Bye"));
        assert!(!is_quit("goodbye"));
    }

    #[test]
    fn numbers_select_sample_questions() {
        assert_eq!(resolve_input("1"), "What are the early symptoms of diabetes?");
        assert_eq!(resolve_input(" 5 "), "Can children take paracetamol?");
        assert_eq!(resolve_input("0"), "0");
        assert_eq!(resolve_input("99"), "99");
        assert_eq!(resolve_input("What is flu? "), "What is flu?");
    }

    #[test]
    fn rendered_sources_are_numbered_and_truncated() {
        let long = "x".repeat(400);
        let response = ChatResponse::with_sources(
            "q",
            "Answer.",
            vec![RetrievedDoc { category: "treatment".into(), question: "How?".into(), answer: long, score: 0.87654 }],
        );
        let text = render_response(&response);
        assert!(text.contains("Sources used: 1"));
        assert!(text.contains("Source 1 (Type: treatment, Relevance: 0.877)"));
        assert!(text.contains(&format!("A: {}...", "x".repeat(300))));
    }

    #[test]
    fn flags_override_settings() {
        let mut settings = Settings::default();
        let args = CommonArgs { csv: Some("faq.csv".into()), cache_dir: None, fake_embeddings: true };
        args.apply(&mut settings);
        assert_eq!(settings.data.csv_path, "faq.csv");
        assert_eq!(settings.cache.dir, "embeddings");
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Fake);
    }
}
