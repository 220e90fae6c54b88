//! regcheck - check a corporate filing against the regulatory corpus
//!
//! Subcommands:
//! - `ingest`: refresh configured sources and taxonomy descriptors into the index,
//!   dropping records of sources no longer configured
//! - `analyze <files..>`: print the compliance report as JSON
//! - `stats`: print index statistics
//!
//! Logs go to stderr so stdout carries only JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use compliance_engine::{inline_documents, ComplianceAnalyzer, EngineConfig};
use corpus_core::{open_index, Embedder, HttpFetcher, IngestionPipeline, Reranker, Retriever, VectorIndex};

/// Exit status when the detected process has no checklist
const UNSUPPORTED_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "regcheck")]
#[command(version, about = "Regulatory compliance checks for corporate filings")]
struct Args {
    /// Engine configuration (TOML)
    #[arg(short, long, default_value = "config/adgm.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, chunk, embed and index the configured sources
    Ingest,
    /// Analyze a set of uploaded documents
    Analyze {
        /// Documents to analyze (.txt, .md or parsed .json)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print diagnostics and classification beside the report
        #[arg(long)]
        verbose: bool,
    },
    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_file(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    let index = open_index(&config.corpus.index)
        .await
        .context("opening vector index")?;
    if config.corpus.index.path.is_none() {
        tracing::warn!("No index path configured; using an in-memory index for this run");
    }

    match args.command {
        Command::Ingest => ingest(&config, index).await,
        Command::Analyze { files, verbose } => analyze(&config, index, &files, verbose).await,
        Command::Stats => {
            let stats = index.stats().await.context("reading index statistics")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(not(feature = "fastembed"))]
fn collaborators(config: &EngineConfig) -> Result<(Arc<dyn Embedder>, Arc<dyn Reranker>)> {
    let embedder = corpus_core::HashingEmbedder::new(config.corpus.index.dimension)?;
    Ok((Arc::new(embedder), Arc::new(corpus_core::LexicalReranker::new())))
}

#[cfg(feature = "fastembed")]
fn collaborators(_config: &EngineConfig) -> Result<(Arc<dyn Embedder>, Arc<dyn Reranker>)> {
    let embedder = corpus_core::BgeEmbedder::new().context("loading embedding model")?;
    let reranker = corpus_core::BgeReranker::new().context("loading reranker model")?;
    Ok((Arc::new(embedder), Arc::new(reranker)))
}

async fn ingest(config: &EngineConfig, index: Arc<dyn VectorIndex>) -> Result<ExitCode> {
    let (embedder, _) = collaborators(config)?;
    let fetcher = Arc::new(HttpFetcher::new()?);
    let pipeline = IngestionPipeline::new(&config.corpus, fetcher, embedder, index)?;

    let descriptors = inline_documents(&config.taxonomy);
    let sources = pipeline.refresh(&config.corpus.sources).await;
    let taxonomy = pipeline.ingest_inline(&descriptors).await;

    let configured: BTreeSet<String> = config
        .corpus
        .sources
        .iter()
        .map(|s| s.url.clone())
        .chain(descriptors.iter().map(|d| d.source_ref.clone()))
        .collect();
    let pruned = pipeline.prune(&configured).await.context("pruning retired sources")?;

    let output = serde_json::json!({
        "sources": sources,
        "taxonomy": taxonomy,
        "pruned": pruned,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

async fn analyze(
    config: &EngineConfig,
    index: Arc<dyn VectorIndex>,
    files: &[PathBuf],
    verbose: bool,
) -> Result<ExitCode> {
    if index.count().await? == 0 {
        tracing::warn!("Index is empty; run `regcheck ingest` first for citations and classification");
    }

    let (embedder, reranker) = collaborators(config)?;
    let retriever = Retriever::new(&config.corpus.rag, embedder, reranker, index)?;
    let analyzer = ComplianceAnalyzer::new(config, Arc::new(retriever))?;

    let outcome = match analyzer.analyze_files(files).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_unsupported() => {
            tracing::error!("{}", e);
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            return Ok(ExitCode::from(UNSUPPORTED_EXIT));
        }
        Err(e) => return Err(e).context("analysis failed"),
    };

    for diagnostic in &outcome.diagnostics {
        tracing::warn!("{}", diagnostic);
    }

    let output = if verbose {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string_pretty(&outcome.report)?
    };
    println!("{}", output);
    Ok(ExitCode::SUCCESS)
}
