//! # Inquest CLI (`inq`)
//!
//! The `inq` binary is the primary interface for Inquest. It provides
//! commands for database initialization, ingesting URLs and documents,
//! asking questions, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! inq --config ./config/inq.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `inq init` | Create the SQLite database and schema |
//! | `inq ingest urls <URL>...` | Rebuild the knowledge base from web pages |
//! | `inq ingest files <PATH>...` | Rebuild the knowledge base from local documents |
//! | `inq ask "<question>"` | Answer a question from the stored corpus |
//! | `inq serve` | Start the JSON HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use inquest::config;
use inquest::engine::Engine;
use inquest::models::RawFile;
use inquest::progress::StderrProgress;
use inquest::server;
use inquest::store::Store;

/// Inquest — a retrieval-augmented research assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/inq.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "inq",
    about = "Inquest — ingest URLs and documents, then ask questions with cited sources",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/inq.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the chunk tables. This command
    /// is idempotent.
    Init,

    /// Rebuild the knowledge base from URLs or local documents.
    ///
    /// Each run replaces the previous corpus entirely.
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },

    /// Answer a question from the stored corpus.
    ///
    /// Prints the answer followed by the sources it was drawn from.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

/// Ingest subcommands.
#[derive(Subcommand)]
enum IngestSource {
    /// Fetch and ingest web pages.
    Urls {
        /// One or more URLs to fetch.
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Parse and ingest local files (PDF, DOCX, or plain text).
    Files {
        /// One or more file paths.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inquest=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            Store::open(&cfg.store.path, cfg.retrieval.top_k, cfg.embedding.batch_size).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { source } => {
            let engine = Engine::new(cfg).await?;
            let report = match source {
                IngestSource::Urls { urls } => engine.ingest_urls(&urls, &StderrProgress).await?,
                IngestSource::Files { paths } => {
                    let mut files = Vec::with_capacity(paths.len());
                    for path in &paths {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string());
                        let bytes = std::fs::read(path).map_err(|e| {
                            anyhow::anyhow!("failed to read {}: {}", path.display(), e)
                        })?;
                        files.push(RawFile { name, bytes });
                    }
                    engine.ingest_files(&files, &StderrProgress).await?
                }
            };

            for item in &report.items {
                match &item.result {
                    Ok(documents) => {
                        println!("  {} ({} document(s))", item.source, documents)
                    }
                    Err(error) => println!("  {} FAILED: {}", item.source, error),
                }
            }
            if !report.succeeded() {
                std::process::exit(1);
            }
        }
        Commands::Ask { question } => {
            let engine = Engine::new(cfg).await?;
            let result = engine.query(&question).await?;
            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!("\nSources:\n{}", result.sources);
            }
        }
        Commands::Serve => {
            let engine = Engine::new(cfg).await?;
            server::run_server(Arc::new(engine)).await?;
        }
    }

    Ok(())
}
