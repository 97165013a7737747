use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use lexdb_core::config::{Config, Settings};
use lexdb_core::data_processor::DataProcessor;
use lexdb_core::error::Error;
use lexdb_core::types::QueryRequest;
use lexdb_core::Chunker;
use lexdb_embed::{probe_embedder, EmbedderStatus};
use lexdb_hybrid::{ResponseStatus, Retriever};
use lexdb_vector::{IndexBuilder, VectorIndex};
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "Usage: lexdb <ingest [DIR] [--limit N] | query \"<text>\" [--limit N] | health>";

struct Args {
    command: String,
    positional: Option<String>,
    limit: Option<usize>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let mut positional = None;
    let mut limit = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--limit" | "-n" => {
                let value = args.next().ok_or_else(|| anyhow!("--limit requires a number"))?;
                let n = value
                    .parse::<usize>()
                    .map_err(|_| anyhow!("--limit requires a number, got {value:?}"))?;
                limit = Some(n);
            }
            _ if !arg.starts_with('-') && positional.is_none() => positional = Some(arg),
            _ => return Err(anyhow!("unexpected argument {arg:?}\n{USAGE}")),
        }
    }
    Ok(Args { command, positional, limit })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let settings = Config::load()?.settings()?;
    match args.command.as_str() {
        "ingest" => ingest(&settings, args.positional.map(PathBuf::from), args.limit),
        "query" => {
            let text = args.positional.ok_or_else(|| anyhow!(USAGE))?;
            query(&settings, &text, args.limit).await
        }
        "health" => health(&settings),
        other => Err(anyhow!("unknown command {other:?}\n{USAGE}")),
    }
}

fn ingest(settings: &Settings, dir: Option<PathBuf>, limit: Option<usize>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| settings.data.documents_dir());
    println!("Ingesting from {}", dir.display());

    let processor = DataProcessor::new();
    let docs = match limit {
        Some(n) => processor.load_directory_limited(&dir, n)?,
        None => processor.load_directory(&dir)?,
    };
    if docs.is_empty() {
        return Err(anyhow!("no .txt documents found in {}", dir.display()));
    }

    let chunker = Chunker::new(settings.chunking.clone())?;
    let mut builder = IndexBuilder::new(chunker)
        .with_batch_size(settings.embedding.batch_size)
        .with_progress(true);
    match probe_embedder(&settings.embedding) {
        EmbedderStatus::Ready(embedder) => builder = builder.with_embedder(embedder),
        EmbedderStatus::Unavailable(reason) => {
            tracing::warn!(%reason, "no embedder, building keyword-only index");
        }
    }

    let index_path = settings.data.index_path();
    match VectorIndex::load(&index_path) {
        Ok(previous) => builder = builder.reuse_from(&previous),
        Err(Error::NotFound(_)) => {}
        Err(e) => tracing::warn!(error = %e, "previous index unreadable, embedding from scratch"),
    }

    let index = builder.build(&docs)?;
    index.save(&index_path)?;
    println!(
        "Indexed {} documents into {} chunks ({}) at {}",
        index.documents(),
        index.len(),
        index.embedder_id().unwrap_or("keyword only"),
        index_path.display()
    );
    Ok(())
}

async fn query(settings: &Settings, text: &str, limit: Option<usize>) -> Result<()> {
    let retriever = Retriever::from_settings(settings)?;
    let mut request = QueryRequest::new(text);
    if let Some(n) = limit {
        request = request.with_max_results(n);
    }
    let response = match retriever.respond(&request).await {
        Ok(r) => r,
        Err(Error::EmptyQuery) => {
            eprintln!("Query is empty.\n{USAGE}");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    if response.status != ResponseStatus::Found {
        println!("{}", response.message().unwrap_or_default());
        return Ok(());
    }
    let strategy = response.strategy.map(|s| s.to_string()).unwrap_or_default();
    println!("{} result(s) via {} search\n", response.results.len(), strategy);
    for (i, hit) in response.results.iter().enumerate() {
        println!("{}. {} (score {:.3})", i + 1, hit.source, hit.score);
        println!("{}\n", hit.content.trim());
    }
    Ok(())
}

fn health(settings: &Settings) -> Result<()> {
    let retriever = Retriever::from_settings(settings)?;
    println!("{}", serde_json::to_string_pretty(&retriever.health())?);
    Ok(())
}
