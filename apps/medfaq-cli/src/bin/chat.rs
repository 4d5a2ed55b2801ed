use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Parser;

use medfaq_cli::{
    build_chatbot, init_tracing, is_quit, load_corpus, load_settings, render_response, render_samples, resolve_input, CommonArgs,
    MEDICAL_DISCLAIMER,
};

#[derive(Parser, Debug)]
#[command(name = "medfaq-chat", version, about = "Ask medical questions answered from an FAQ knowledge base")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of FAQ entries used as context per question
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Answer one question and exit
    #[arg(short, long)]
    query: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.common)?;
    if let Some(k) = cli.top_k { settings.retrieval.top_k = k; }
    settings.validate()?;

    let (embedder, corpus) = load_corpus(&settings)?;
    let chatbot = build_chatbot(&settings, embedder, corpus)?;

    if let Some(query) = cli.query {
        println!("{}", render_response(&chatbot.chat(&query)));
        return Ok(());
    }

    println!("🏥 Medical FAQ Chatbot\n=====================");
    println!("{}\n", MEDICAL_DISCLAIMER);
    println!("{}", render_samples());
    println!("Type 'stats' for knowledge-base statistics, 'quit' to exit.");

    let stdin = io::stdin();
    let mut questions_asked = 0usize;
    loop {
        print!("\n❓ You: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 { break; }
        if is_quit(&line) { break; }
        if line.trim().eq_ignore_ascii_case("stats") {
            println!("📊 Total FAQs: {}\n📊 Questions asked: {}", chatbot.total_faqs(), questions_asked);
            continue;
        }

        let query = resolve_input(&line);
        if !query.is_empty() {
            questions_asked += 1;
            if query != line.trim() { println!("➡️  {}", query); }
        }
        let response = chatbot.chat(&query);
        println!("\n🤖 Bot: {}", render_response(&response));
    }
    println!("👋 Goodbye! Take care.");
    Ok(())
}
