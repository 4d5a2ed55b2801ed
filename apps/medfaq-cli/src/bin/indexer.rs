use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use medfaq_cli::{init_tracing, load_corpus, load_settings, CommonArgs};
use medfaq_vector::{cache, CorpusSource};

/// Builds the embedding cache for the configured FAQ dataset.
#[derive(Parser, Debug)]
#[command(name = "medfaq-indexer", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Delete the existing cache and rebuild it
    #[arg(short, long)]
    force: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(&cli.common)?;
    let cache_dir = settings.cache_dir();

    println!("Medical FAQ Indexer\n===================");
    println!("Dataset: {}", settings.csv_path().display());
    println!("Cache:   {}", cache_dir.display());
    if cli.force && cache::exists(&cache_dir) {
        cache::clear(&cache_dir).with_context(|| format!("clear cache at {}", cache_dir.display()))?;
        println!("🗑️  Removed existing cache");
    }

    let start = Instant::now();
    let (_, corpus) = load_corpus(&settings)?;
    match corpus.source() {
        CorpusSource::Built => println!("\n✅ Embedded {} FAQs in {:.1}s", corpus.len(), start.elapsed().as_secs_f32()),
        CorpusSource::Cache => println!("\n✅ Cache already up to date ({} vectors); use --force to rebuild", corpus.index().len()),
    }
    if !corpus.is_synchronized() {
        println!("⚠️  Cache holds {} vectors for {} FAQs; run with --force to rebuild", corpus.index().len(), corpus.len());
    }
    println!("📊 Embedder: {}", corpus.embedder_id());
    Ok(())
}
