use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use docsearch_core::ingest::{read_extracted_archive, read_markdown_dir};
use docsearch_core::{build_index, format_result, search, IdfMode, Index, IndexConfig, QuerySpec, TokenizerConfig};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build an in-memory TF-IDF index over markdown docs and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a docs directory and print index statistics
    Build {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Index a docs directory and run one query against it
    Query {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Query text
        #[arg(long, short)]
        q: String,
        /// Number of results
        #[arg(long, short, default_value_t = 5)]
        k: usize,
        /// Maximum snippet length in characters
        #[arg(long, default_value_t = 1500)]
        snippet: usize,
        /// Field boost as FIELD=WEIGHT; repeatable
        #[arg(long = "boost", value_parser = parse_boost)]
        boosts: Vec<(String, f32)>,
        /// Keyword filter as KEY=VALUE; repeatable
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
        /// Print results as JSON instead of text blocks
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args)]
struct CorpusArgs {
    /// Directory containing .md / .mdx files
    #[arg(long)]
    docs: PathBuf,
    /// Treat the directory as an extracted archive and drop the first path component
    #[arg(long, default_value_t = false)]
    strip_root: bool,
    /// IDF variant: ln(N/df) or ln(1 + N/df)
    #[arg(long, value_enum, default_value_t = IdfArg::Smoothed)]
    idf: IdfArg,
    /// Remove English stop words
    #[arg(long, default_value_t = false)]
    stopwords: bool,
    /// Apply English stemming
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Apply NFKC normalization
    #[arg(long, default_value_t = false)]
    nfkc: bool,
    /// Discard tokens shorter than this
    #[arg(long, default_value_t = 1)]
    min_token_len: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum IdfArg {
    Standard,
    Smoothed,
}

impl CorpusArgs {
    fn config(&self) -> IndexConfig {
        IndexConfig {
            tokenizer: TokenizerConfig {
                unicode_normalize: self.nfkc,
                remove_stopwords: self.stopwords,
                stem: self.stem,
                min_token_len: self.min_token_len,
            },
            idf: match self.idf {
                IdfArg::Standard => IdfMode::Standard,
                IdfArg::Smoothed => IdfMode::Smoothed,
            },
        }
    }

    fn build(&self) -> Result<Index> {
        let raws = if self.strip_root { read_extracted_archive(&self.docs)? } else { read_markdown_dir(&self.docs)? };
        Ok(build_index(raws, &self.config())?)
    }
}

fn parse_boost(s: &str) -> Result<(String, f32), String> {
    let (field, w) = s.split_once('=').ok_or_else(|| format!("expected FIELD=WEIGHT, got '{s}'"))?;
    let w: f32 = w.parse().map_err(|e| format!("invalid weight '{w}': {e}"))?;
    Ok((field.to_string(), w))
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    took_s: f64,
    results: Vec<docsearch_core::ScoredResult>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus } => {
            let index = corpus.build()?;
            println!("{}", serde_json::to_string_pretty(&index.stats())?);
            Ok(())
        }
        Commands::Query { corpus, q, k, snippet, boosts, filters, json } => {
            let index = corpus.build()?;
            let mut spec = QuerySpec::new(q.as_str()).with_top_k(k).with_snippet_length(snippet);
            for (field, w) in boosts {
                spec = spec.with_boost(field, w);
            }
            for (key, value) in filters {
                spec = spec.with_filter(key, value);
            }
            let start = std::time::Instant::now();
            let results = search(&index, &spec)?;
            let took_s = start.elapsed().as_secs_f64();
            tracing::info!(query = %q, hits = results.len(), took_s, "query complete");

            if json {
                println!("{}", serde_json::to_string_pretty(&QueryOutput { query: &q, took_s, results })?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for r in &results {
                    println!("{}\n", format_result(r));
                }
            }
            Ok(())
        }
    }
}
