//! # Danalog Catalog CLI (`catalog`)
//!
//! Imports Danalog spreadsheet exports into a local SQLite store and
//! serves lookup over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! catalog --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog init` | Create the store and catalog table |
//! | `catalog import <file>` | Import an `.xlsx` export, skipping known product codes |
//! | `catalog search <column> <text>` | Substring search on one column |
//! | `catalog stats` | Show store existence, size, and record count |
//! | `catalog export` | Dump every record as JSON |
//! | `catalog serve` | Start the HTTP server |
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use ayal_catalog::{config, export, ingest, migrate, search, server, stats};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Danalog catalog import and lookup service.
#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Danalog catalog: spreadsheet import with product-code dedup, search, and stats",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/catalog.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the store schema.
    ///
    /// Creates the SQLite file and the catalog table. Idempotent.
    Init,

    /// Import a spreadsheet.
    ///
    /// Rows whose product code is already stored are skipped; all other
    /// rows are added with a new id.
    Import {
        /// Path to the `.xlsx` file.
        file: PathBuf,
    },

    /// Search one column for a substring.
    Search {
        /// Column: SQL name, spreadsheet header, or JSON field name.
        column: String,
        /// Text to look for.
        text: String,
    },

    /// Show store statistics.
    Stats,

    /// Export all records as JSON.
    Export {
        /// Output file (defaults to stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            ingest::run_import(&cfg, &file).await?;
        }
        Commands::Search { column, text } => {
            search::run_search(&cfg, &column, &text).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
