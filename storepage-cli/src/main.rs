//! storepage CLI
//!
//! Command-line interface for scraping store pages into a local catalog.

mod async_util;
mod cli_types;
mod commands;
mod error;
mod progress;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use cli_types::{Cli, Commands, ConfigAction, DbArgs};
use commands::scrape::ScrapeArgs;
use error::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = match cli.command {
        Commands::Scrape {
            ids,
            db,
            language,
            base_url,
            jobs,
            log,
        } => commands::scrape::run_scrape(ScrapeArgs {
            ids,
            db: catalog_path(db),
            language,
            base_url,
            jobs,
            log,
            quiet: cli.quiet,
        }),
        Commands::Merge { file, db } => commands::merge::run_merge(&file, &catalog_path(db)),
        Commands::Show { id, db } => commands::show::run_show(id, &catalog_path(db)),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(),
            ConfigAction::Set {
                base_url,
                language,
                timeout_secs,
            } => commands::config::run_config_set(base_url, language, timeout_secs),
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
        },
    };

    report(result)
}

fn catalog_path(args: DbArgs) -> PathBuf {
    args.db.unwrap_or_else(storepage_scraper::default_catalog_path)
}

fn report(result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!(
                "{} {}",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                e,
            );
            ExitCode::FAILURE
        }
    }
}

/// Install the logger.
///
/// Normal output is plain messages at info level. `--verbose` switches to
/// timestamped debug output, `--quiet` keeps only warnings and errors.
/// `RUST_LOG` still overrides per-module levels.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stdout);

    if !verbose {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    } else {
        builder.format_timestamp_millis();
    }
    builder.init();
}
