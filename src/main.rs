//! # KB Ingest CLI (`kbi`)
//!
//! The `kbi` binary drives the ingestion pipeline from the command line.
//!
//! ## Usage
//!
//! ```bash
//! kbi --config ./config/kbi.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kbi init` | Create the SQLite database and run schema migrations |
//! | `kbi ingest <file>` | Ingest one file into the knowledge base |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! kbi init --config ./config/kbi.toml
//!
//! # Ingest a document into a folder
//! kbi ingest ./docs/runbook.md --folder-id ops --config ./config/kbi.toml
//!
//! # Override the declared MIME type
//! kbi ingest ./export.bin --folder-id data --mime text/csv
//! ```

mod chunk;
mod config;
mod db;
mod extract;
mod fallback;
mod migrate;
mod models;
mod pipeline;
mod sniff;
mod storage;
mod summarize;
mod transport;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::models::{IngestOutcome, IngestRequest};

/// KB Ingest CLI — a knowledge-base file ingestion and summarization
/// pipeline for AI agents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kbi.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kbi",
    about = "KB Ingest — a knowledge-base file ingestion and summarization pipeline",
    version,
    long_about = "KB Ingest stores uploaded files in object storage, extracts their text \
    (plain text, PDF, DOCX), generates a retrieval-oriented summary via an ordered ladder of \
    model candidates with a deterministic fallback, and records the entry in SQLite."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/kbi.toml`. Database, storage, and
    /// summarization settings are read from this file.
    #[arg(long, global = true, default_value = "./config/kbi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the knowledge-base entries
    /// table. This command is idempotent — running it multiple times is
    /// safe.
    Init,

    /// Ingest a file into the knowledge base.
    ///
    /// Uploads the file to the configured storage provider, extracts its
    /// text, generates a summary, and records the entry. Prints the entry
    /// id and summary length on success.
    Ingest {
        /// Path to the file to ingest.
        file: PathBuf,

        /// Destination folder id within the knowledge base.
        #[arg(long)]
        folder_id: String,

        /// Owning account/tenant id.
        #[arg(long, default_value = "local")]
        account_id: String,

        /// Declared MIME type. Defaults to a guess from the file extension.
        #[arg(long)]
        mime: Option<String>,
    },
}

/// Configure the tracing subscriber: `RUST_LOG`-driven filtering with a
/// compact stdout layer, defaulting to `info`.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}

/// Guess a declared MIME type from a file extension.
fn guess_mime(filename: &str) -> String {
    match extract::file_extension(filename).as_deref() {
        Some("md") => "text/markdown".to_string(),
        Some("txt" | "log") => "text/plain".to_string(),
        Some("csv") => "text/csv".to_string(),
        Some("json") => "application/json".to_string(),
        Some("yaml" | "yml") => "text/yaml".to_string(),
        Some("xml") => "application/xml".to_string(),
        Some("html" | "htm") => "text/html".to_string(),
        Some("pdf") => "application/pdf".to_string(),
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string()
        }
        _ => "application/octet-stream".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("init {}", config.db.path.display());
            println!("ok");
        }
        Commands::Ingest {
            file,
            folder_id,
            account_id,
            mime,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let mime_type = mime.unwrap_or_else(|| guess_mime(&filename));

            let pool = db::connect(&config).await?;
            let outcome = pipeline::process_file(
                &config,
                &pool,
                IngestRequest {
                    account_id,
                    folder_id,
                    filename,
                    mime_type,
                    bytes,
                },
            )
            .await;
            pool.close().await;

            match outcome {
                IngestOutcome::Success(receipt) => {
                    println!("ingest {}", receipt.filename);
                    println!("  entry id: {}", receipt.entry_id);
                    println!("  summary length: {} chars", receipt.summary_length);
                    println!("ok");
                }
                IngestOutcome::Failure { error } => {
                    eprintln!("error: {}", error);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
