use anyhow::Result;
use clap::Parser;

use medfaq_cli::{init_tracing, load_corpus, load_settings, CommonArgs, SOURCE_PREVIEW_CHARS};
use medfaq_rag::preview;
use medfaq_vector::{Retriever, DEFAULT_TOP_K};

/// Retrieval only: prints the closest FAQ entries without calling the LLM.
#[derive(Parser, Debug)]
#[command(name = "medfaq-search", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Search query
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(&cli.common)?;
    let (embedder, corpus) = load_corpus(&settings)?;
    let retriever = Retriever::new(corpus, embedder);

    let query = cli.query.join(" ");
    println!("🔍 Searching {} FAQs for: '{}'", retriever.corpus().len(), query);
    let docs = retriever.retrieve(&query, cli.top_k)?;
    if docs.is_empty() {
        println!("❌ No results found");
        return Ok(());
    }
    for (i, doc) in docs.iter().enumerate() {
        println!("\n{}. [{}] score {:.3}\n   Q: {}\n   A: {}", i + 1, doc.category, doc.score, doc.question, preview(&doc.answer, SOURCE_PREVIEW_CHARS));
    }
    Ok(())
}
