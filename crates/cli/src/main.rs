//! cairn command-line interface.
//!
//! Runs the same cache operations as the MCP server against the local cache
//! directory and prints each result as JSON on stdout.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Document preview and table import cache.
#[derive(Parser, Debug)]
#[command(name = "cairn", version, about = "Document preview and table import cache")]
pub struct Cli {
    /// Enable debug-level logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `cairn.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Principal used for permission checks.
    #[arg(long, global = true, default_value = "cli")]
    pub principal: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a document to PDF, or return the cached preview.
    Preview { id: String },
    /// Import a CSV or spreadsheet document as a table.
    Import { id: String },
    /// Re-import a document's table from its current content.
    Sync { id: String },
    /// Show the columns of an imported table.
    Schema { id: String },
    /// Print the first rows of an imported table.
    Rows {
        id: String,

        /// Number of rows (capped by `max_preview_rows`).
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Remove an imported table and its view.
    Remove { id: String },
    /// List imported tables.
    List,
    /// Delete previews older than the given age.
    Sweep {
        /// Age in days; defaults to `preview_max_age_days`.
        #[arg(long)]
        days: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match commands::run(&cli).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
