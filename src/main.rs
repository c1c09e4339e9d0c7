use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tutor_rag::commands::{ask, ingest, search, serve, show_config};
use tutor_rag::config::Config;

#[derive(Parser)]
#[command(name = "tutor-rag")]
#[command(about = "A course tutor answering questions from uploaded PDF and text documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, uploads and the saved index
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web front end
    Serve {
        /// Address to listen on
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Rebuild the index from every document in the uploads directory
    Ingest,
    /// Show the chunks nearest to a question
    Search {
        question: String,
        /// Number of chunks to return
        #[arg(short)]
        k: Option<usize>,
    },
    /// Answer a question from the command line
    Ask { question: String },
    /// Inspect configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tutor_rag=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.base_dir).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await?,
        Commands::Ingest => ingest(config).await?,
        Commands::Search { question, k } => search(config, question, k).await?,
        Commands::Ask { question } => ask(config, question).await?,
        Commands::Config { show } => {
            show_config(&config);
            if !show {
                eprintln!();
                eprintln!("Edit {} to change these settings.", config.config_file_path().display());
            }
        }
    }

    Ok(())
}
