use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use storepage_catalog::Catalog;
use storepage_scraper::{
    HttpTransport, LogEntry, LogSummary, ScrapeEvent, StoreFetcher, StoreSettings, scrape_many,
};

use crate::async_util::run_with_events;
use crate::error::CliError;
use crate::progress::ScrapeProgress;

pub(crate) struct ScrapeArgs {
    pub ids: Vec<u32>,
    pub db: PathBuf,
    pub language: Option<String>,
    pub base_url: Option<String>,
    pub jobs: usize,
    pub log: Option<PathBuf>,
    pub quiet: bool,
}

/// Run the scrape command.
pub(crate) fn run_scrape(args: ScrapeArgs) -> Result<(), CliError> {
    let mut settings = StoreSettings::load()?;
    if let Some(language) = args.language {
        settings = settings.with_language(language);
    }
    if let Some(base_url) = args.base_url.as_deref() {
        settings = settings.with_base_url(base_url)?;
    }

    let mut catalog = Catalog::load(&args.db)?;

    log::info!(
        "Scraping {} ids from {} ({})",
        args.ids.len(),
        settings.base_url.if_supports_color(Stdout, |t| t.cyan()),
        settings.language,
    );
    log::info!(
        "Catalog: {}",
        args.db.display().if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!("");

    let transport = HttpTransport::new(&settings)?;
    let fetcher = StoreFetcher::new(transport, settings);
    let live = catalog.entries_for(&args.ids);
    let total = live.len();
    let jobs = args.jobs.max(1);
    let quiet = args.quiet;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("failed to create tokio runtime: {e}")))?;

    let result = rt.block_on(async {
        let mut progress = ScrapeProgress::new(total, jobs, quiet);
        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel::<ScrapeEvent>();

        let result = run_with_events(
            scrape_many(&fetcher, live, jobs, event_tx),
            event_rx,
            |e| progress.handle(e),
        )
        .await;

        log::debug!("{} of {} pages finished", progress.finished(), total);
        progress.clear();
        result
    });

    for entry in result.log.entries() {
        match entry {
            LogEntry::Updated {
                id,
                name,
                kind,
                alias,
            } => {
                let alias = alias.map(|a| format!(" (parent {a})")).unwrap_or_default();
                log::info!(
                    "  {} {}: \"{}\" {}{}",
                    "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                    id,
                    name,
                    kind.if_supports_color(Stdout, |t| t.dimmed()),
                    alias,
                );
            }
            LogEntry::Aborted { id, reason } => {
                log::warn!(
                    "  {} {}: {}",
                    "?".if_supports_color(Stdout, |t| t.yellow()),
                    id,
                    reason,
                );
            }
            LogEntry::Failed { id, message } => {
                log::warn!(
                    "  {} {}: {}",
                    "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                    id,
                    message,
                );
            }
        }
    }

    let summary = result.log.summary();
    for entry in result.entries {
        catalog.insert(entry);
    }
    if summary.total_updated > 0 {
        catalog.save(&args.db)?;
    }

    if let Some(path) = &args.log {
        if let Err(e) = result.log.write_to_file(path) {
            log::warn!("Warning: could not write scrape log: {}", e);
        }
    }

    log::info!("");
    log::info!("{}", "Summary:".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  {} {} updated ({} redirected), catalog has {} entries",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.total_updated,
        summary.redirected,
        catalog.len(),
    );
    if summary.total_aborted > 0 {
        log::warn!(
            "  {} {} aborted",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            summary.total_aborted,
        );
    }
    if summary.total_failed > 0 {
        log::warn!(
            "  {} {} failed",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.total_failed,
        );
    }

    check_failures(&summary, total)
}

/// Transport failures fail the command once the rest of the batch is saved.
fn check_failures(summary: &LogSummary, total: usize) -> Result<(), CliError> {
    match summary.total_failed {
        0 => Ok(()),
        failed => Err(CliError::ScrapeFailed { failed, total }),
    }
}
