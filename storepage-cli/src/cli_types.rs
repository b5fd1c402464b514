//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "storepage")]
#[command(about = "Scrape store pages into a local catalog", long_about = None)]
pub(crate) struct Cli {
    /// Only show warnings and errors (suppress normal output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// The catalog file a command reads and writes.
#[derive(Args, Clone)]
pub(crate) struct DbArgs {
    /// Catalog file (default: catalog.json in the data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Scrape store pages for one or more ids into the catalog
    Scrape {
        /// Store ids to scrape
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<u32>,

        #[command(flatten)]
        db: DbArgs,

        /// Store page language (overrides settings)
        #[arg(long)]
        language: Option<String>,

        /// Store base URL (overrides settings)
        #[arg(long)]
        base_url: Option<String>,

        /// Number of pages fetched concurrently
        #[arg(short, long, default_value_t = 4)]
        jobs: usize,

        /// Write a scrape log to this file
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Merge every entry of another catalog file into the catalog
    Merge {
        /// Catalog file to merge from
        file: PathBuf,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Print one catalog entry as JSON
    Show {
        /// Store id
        id: u32,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Show or locate store settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved settings and their sources
    Show,

    /// Write settings to the settings file
    Set {
        /// Store base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Store page language (e.g., english, french, schinese)
        #[arg(long)]
        language: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print the settings file path
    Path,
}
