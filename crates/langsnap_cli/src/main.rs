//! Langsnap CLI
//!
//! Moves language snapshots between a JSON database dump and a directory
//! bucket.
//!
//! # Commands
//!
//! - `export` - Write a language's snapshot into the bucket
//! - `restore` - Load a snapshot back, keeping identifiers
//! - `import` - Load a snapshot, giving rows fresh identifiers
//! - `discard` - Delete a snapshot from the bucket

mod commands;

use clap::{Parser, Subcommand};
use langsnap_engine::TransferMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Language snapshot transfer tools.
#[derive(Parser)]
#[command(name = "langsnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON database dump
    #[arg(global = true, long, default_value = "langsnap-db.json")]
    db: PathBuf,

    /// Directory used as the snapshot bucket
    #[arg(global = true, long, default_value = "langsnap-bucket")]
    bucket: PathBuf,

    /// Attempts per resource before giving up
    #[arg(global = true, long, default_value = "3")]
    attempts: u32,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a language into a snapshot
    Export {
        /// Language identifier
        #[arg(short, long)]
        language: String,

        /// Snapshot identifier
        #[arg(short, long)]
        snapshot: String,
    },

    /// Restore a snapshot into the same environment
    Restore {
        /// Language identifier the snapshot was taken from
        #[arg(short, long)]
        language: String,

        /// Expected language code
        #[arg(short, long)]
        code: String,

        /// Snapshot identifier
        #[arg(short, long)]
        snapshot: String,

        /// Delete the snapshot afterwards
        #[arg(long)]
        discard: bool,
    },

    /// Import a snapshot taken in another environment
    Import {
        /// Language identifier in the source environment
        #[arg(short, long)]
        language: String,

        /// Expected language code
        #[arg(short, long)]
        code: String,

        /// Snapshot identifier
        #[arg(short, long)]
        snapshot: String,

        /// Delete the snapshot afterwards
        #[arg(long)]
        discard: bool,
    },

    /// Delete a snapshot from the bucket
    Discard {
        /// Language identifier
        #[arg(short, long)]
        language: String,

        /// Snapshot identifier
        #[arg(short, long)]
        snapshot: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let env = commands::Environment::new(cli.db, cli.bucket, cli.attempts);
    match cli.command {
        Commands::Export { language, snapshot } => {
            commands::transfer::export(&env, language, snapshot)?;
        }
        Commands::Restore {
            language,
            code,
            snapshot,
            discard,
        } => {
            commands::transfer::import(&env, TransferMode::Restore, language, code, snapshot, discard)?;
        }
        Commands::Import {
            language,
            code,
            snapshot,
            discard,
        } => {
            commands::transfer::import(&env, TransferMode::Import, language, code, snapshot, discard)?;
        }
        Commands::Discard { language, snapshot } => {
            commands::discard::run(&env, &language, &snapshot)?;
        }
    }

    Ok(())
}
