use anyhow::{Context, Result};
use clap::Parser;
use sift_core::{QueryEngine, SearchOptions, SearchResults};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Rank indexed documents against free-text terms", long_about = None)]
struct Args {
    /// Index directory holding dictionary.txt and postings.txt
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Number of results to print
    #[arg(long, short = 'k', default_value_t = sift_core::query::DEFAULT_TOP_K)]
    top_k: usize,
    /// Query terms
    #[arg(required = true)]
    terms: Vec<String>,
}

fn print_results(query: &str, results: &SearchResults) {
    for term in results.missing_terms() {
        println!("{term}: not in index");
    }
    println!("{query} was found in {} documents", results.total_matches);
    for hit in &results.hits {
        println!("{}, {}", hit.doc_id, hit.score);
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let engine = QueryEngine::open(&args.index)
        .with_context(|| format!("loading index from {}", args.index.display()))?;

    let start = Instant::now();
    let query = args.terms.join(" ");
    let results = engine.search_text(&query, &SearchOptions { top_k: args.top_k });
    let elapsed = start.elapsed();

    print_results(&query, &results);
    println!("Total time for query: {}", elapsed.as_secs_f64());
    Ok(())
}
