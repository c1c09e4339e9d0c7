use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::RagError;
use crate::config::Config;
use crate::embeddings::{Embedder, OllamaClient};
use crate::generation::GeminiClient;
use crate::index::IndexStore;
use crate::indexer::{IngestOutcome, Indexer};
use crate::retrieval::{self, RetrievedChunk};
use crate::server;
use crate::service::RagService;

fn embedder(config: &Config) -> Result<Arc<OllamaClient>> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    Ok(Arc::new(client))
}

fn generator(config: &Config) -> Result<Arc<GeminiClient>> {
    let api_key = config.require_api_key()?;
    let client =
        GeminiClient::new(&config.gemini, api_key).context("Failed to create Gemini client")?;
    Ok(Arc::new(client))
}

fn spinner(message: &'static str) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Start the web front end
#[inline]
pub async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let generator = generator(&config)?;
    let embedder = embedder(&config)?;

    let health = Arc::clone(&embedder);
    if let Err(e) = tokio::task::spawn_blocking(move || health.health_check())
        .await
        .context("Health check task failed")?
    {
        warn!("Embedding server is not ready: {:#}", e);
        eprintln!(
            "{} {:#}",
            style("Warning: embedding server is not ready:").yellow(),
            e
        );
    }

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid listen address: {}", host))?;
    let addr = SocketAddr::new(ip, port);

    let service = Arc::new(RagService::new(config, embedder, generator));
    if !service.open().await {
        println!("No index loaded yet. Upload a document to build one.");
    }

    println!(
        "{} http://{}",
        style("Tutor running on").bold().green(),
        addr
    );
    println!("Press Ctrl+C to stop the server");

    server::serve(service, addr).await
}

/// Rebuild the index from the uploads directory
#[inline]
pub async fn ingest(config: Config) -> Result<()> {
    let indexer = Indexer::new(&config, embedder(&config)?);
    println!(
        "Indexing documents in {}",
        style(indexer.uploads_dir().display()).cyan()
    );

    let bar = spinner("Loading, chunking and embedding documents");
    let outcome = tokio::task::spawn_blocking(move || indexer.build_index())
        .await
        .context("Ingestion task failed")?;
    bar.finish_and_clear();
    let outcome = outcome?;

    let report = outcome.report();
    for skipped in &report.skipped {
        println!(
            "  {} {}: {}",
            style("skipped").yellow(),
            skipped.file_name,
            skipped.reason
        );
    }

    match &outcome {
        IngestOutcome::Built { snapshot, report } => {
            println!(
                "{} {} chunks from {} documents ({} dimensions)",
                style("Indexed").bold().green(),
                report.chunks,
                report.documents,
                snapshot.index().dimension()
            );
            println!("Saved to {}", style(config.index_dir().display()).dim());
        }
        IngestOutcome::Empty(_) => {
            println!(
                "{}",
                style("No text found to index. Add .pdf or .txt files to the uploads directory.")
                    .yellow()
            );
        }
    }

    Ok(())
}

/// Print the chunks nearest to `question`
#[inline]
pub async fn search(config: Config, question: String, k: Option<usize>) -> Result<()> {
    let embedder = embedder(&config)?;
    let k = k.unwrap_or(config.retrieval.top_k);
    let store = IndexStore::new(config.index_dir());

    let results = tokio::task::spawn_blocking(move || -> Result<Vec<RetrievedChunk>> {
        let snapshot = store.load()?;
        if snapshot.model() != embedder.model() {
            return Err(RagError::IndexMismatch {
                built_with: snapshot.model().to_string(),
                configured: embedder.model().to_string(),
            }
            .into());
        }
        retrieval::retrieve(embedder.as_ref(), Some(&snapshot), &question, k)
    })
    .await
    .context("Search task failed")??;

    if results.is_empty() {
        println!("No matching chunks.");
        return Ok(());
    }

    for (rank, chunk) in results.iter().enumerate() {
        println!(
            "{} {} {}",
            style(format!("{}.", rank + 1)).bold(),
            style(chunk.source_label()).cyan(),
            style(format!("(distance {:.4})", chunk.distance)).dim()
        );
        println!("   {}", chunk.text.trim().replace('\n', "\n   "));
        println!();
    }

    Ok(())
}

/// Answer one question from the command line
#[inline]
pub async fn ask(config: Config, question: String) -> Result<()> {
    let generator = generator(&config)?;
    let embedder = embedder(&config)?;

    let service = RagService::new(config, embedder, generator);
    service.open().await;

    let bar = spinner("Thinking");
    let reply = service.chat(&question).await;
    bar.finish_and_clear();

    info!("Answered with {} sources", reply.sources.as_ref().map_or(0, Vec::len));
    println!("{}", reply.answer);

    if let Some(sources) = reply.sources.filter(|sources| !sources.is_empty()) {
        println!();
        println!("{} {}", style("Sources:").bold(), sources.join(", "));
    }

    Ok(())
}

/// Print the effective configuration
#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Server:").bold().yellow());
    eprintln!(
        "  Listen: {}",
        style(format!("{}:{}", config.server.host, config.server.port)).cyan()
    );
    eprintln!(
        "  Max upload: {} bytes",
        style(config.server.max_upload_bytes).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embeddings (Ollama):").bold().yellow());
    match config.ollama.ollama_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Generation (Gemini):").bold().yellow());
    eprintln!("  Model: {}", style(&config.gemini.model).cyan());
    let key_status = if config.require_api_key().is_ok() {
        style("set").green()
    } else {
        style("not set").red()
    };
    eprintln!("  API key: {}", key_status);

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!(
        "  Chunk size: {} (overlap {})",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.overlap).cyan()
    );
    eprintln!("  Top k: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Uploads: {}",
        style(config.uploads_dir().display()).dim()
    );
    eprintln!("Index: {}", style(config.index_dir().display()).dim());
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}
