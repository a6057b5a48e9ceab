use anyhow::Result;
use clap::{Parser, ValueEnum};
use docsearch_core::{IdfMode, IndexConfig, TokenizerConfig};
use server::{build_app, AppState, Settings};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory containing .md / .mdx files
    #[arg(long, default_value = "./docs")]
    docs: PathBuf,
    /// Treat the docs directory as an extracted archive and drop the first path component
    #[arg(long, default_value_t = false)]
    strip_root: bool,
    /// IDF variant
    #[arg(long, value_enum, default_value_t = IdfArg::Smoothed)]
    idf: IdfArg,
    /// Remove English stop words
    #[arg(long, default_value_t = false)]
    stopwords: bool,
    /// Apply English stemming
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[derive(Clone, Copy, ValueEnum)]
enum IdfArg {
    Standard,
    Smoothed,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let index = IndexConfig {
        tokenizer: TokenizerConfig { remove_stopwords: args.stopwords, stem: args.stem, ..Default::default() },
        idf: match args.idf {
            IdfArg::Standard => IdfMode::Standard,
            IdfArg::Smoothed => IdfMode::Smoothed,
        },
    };
    let state = AppState::new(Settings::from_env(args.docs.clone(), args.strip_root, index))?;

    // Queries get 503 until the first build lands.
    let loader = state.clone();
    tokio::task::spawn_blocking(move || match loader.reload() {
        Ok(stats) => tracing::info!(num_docs = stats.num_docs, num_terms = stats.num_terms, "initial index ready"),
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(%error, "initial index build failed");
        }
    });

    let app = build_app(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, docs = %args.docs.display(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
