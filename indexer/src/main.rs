use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sift_core::build::{build_index, dump_tokens, write_weight_files, BuildOptions};
use sift_core::corpus::{HtmlText, PlainText, TextExtractor};
use sift_core::{IdfMode, Stopwords};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a cosine-ranked TF-IDF index from a directory of HTML files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CorpusArgs {
    /// Directory holding the corpus, one document per file
    #[arg(long)]
    input: PathBuf,
    /// Output directory
    #[arg(long)]
    output: PathBuf,
    /// Newline-delimited stopword list
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Treat input files as plain text instead of HTML
    #[arg(long, default_value_t = false)]
    plain_text: bool,
    /// Worker threads for document processing (default: one per core)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build dictionary.txt and postings.txt
    Build {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
    },
    /// Write per-document token files and corpus frequency reports
    Tokenize {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Write a .wts file of normalized term weights per document
    Weights {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
    },
}

fn options(corpus: &CorpusArgs, smoothed_idf: bool) -> Result<BuildOptions> {
    let stopwords = match &corpus.stopwords {
        Some(path) => Stopwords::from_file(path)?,
        None => Stopwords::empty(),
    };
    let extractor: Arc<dyn TextExtractor> = if corpus.plain_text { Arc::new(PlainText) } else { Arc::new(HtmlText) };
    let idf = if smoothed_idf { IdfMode::Smoothed } else { IdfMode::Standard };
    Ok(BuildOptions { stopwords, idf, extractor, threads: corpus.threads })
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus, smoothed_idf } => {
            let opts = options(&corpus, smoothed_idf)?;
            let (report, _meta) = build_index(&corpus.input, &corpus.output, &opts)
                .with_context(|| format!("building index from {}", corpus.input.display()))?;
            println!(
                "indexed {} documents ({} skipped, {} empty): {} terms, {} postings in {} ms",
                report.num_docs, report.skipped, report.empty, report.num_terms, report.num_postings, report.elapsed_ms
            );
        }
        Commands::Tokenize { corpus } => {
            let opts = options(&corpus, false)?;
            let report = dump_tokens(&corpus.input, &corpus.output, &opts)
                .with_context(|| format!("tokenizing {}", corpus.input.display()))?;
            println!(
                "tokenized {} documents ({} skipped): {} tokens, {} distinct",
                report.num_docs, report.skipped, report.num_tokens, report.distinct
            );
        }
        Commands::Weights { corpus, smoothed_idf } => {
            let opts = options(&corpus, smoothed_idf)?;
            let report = write_weight_files(&corpus.input, &corpus.output, &opts)
                .with_context(|| format!("weighing {}", corpus.input.display()))?;
            println!("wrote weights for {} documents in {} ms", report.num_docs, report.elapsed_ms);
        }
    }
    Ok(())
}
