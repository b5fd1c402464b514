use futures::stream::{self, StreamExt};
use storepage_catalog::CatalogEntry;
use tokio::sync::mpsc;

use crate::client::StoreTransport;
use crate::error::{AbortReason, ScrapeError};
use crate::extract;
use crate::fetch::{FetchOutcome, FetchedPage, StoreFetcher};
use crate::log::{LogEntry, ScrapeLog};

/// What a scrape did to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The page was read into the entry.
    Updated { alias: Option<u32> },
    /// The page was unusable; the entry is untouched.
    Aborted(AbortReason),
}

/// Scrape the store page for `entry` and update it in place.
///
/// Aborts leave the entry untouched and return `Ok`. Only transport
/// failures are returned as errors, after being logged.
pub async fn scrape_from_store<T: StoreTransport>(
    entry: &mut CatalogEntry,
    fetcher: &StoreFetcher<T>,
) -> Result<ScrapeOutcome, ScrapeError> {
    scrape_from_store_at(entry, fetcher, chrono::Utc::now().timestamp()).await
}

/// [`scrape_from_store`] with an explicit scrape timestamp.
pub async fn scrape_from_store_at<T: StoreTransport>(
    entry: &mut CatalogEntry,
    fetcher: &StoreFetcher<T>,
    now: i64,
) -> Result<ScrapeOutcome, ScrapeError> {
    match fetcher.fetch(entry.id()).await? {
        FetchOutcome::Aborted(reason) => Ok(ScrapeOutcome::Aborted(reason)),
        FetchOutcome::Page(page) => {
            apply_page(entry, &page, now);
            Ok(ScrapeOutcome::Updated {
                alias: page.redirect_target,
            })
        }
    }
}

/// Fold a fetched page into `entry`: kind, every extractor, then the alias.
pub fn apply_page(entry: &mut CatalogEntry, page: &FetchedPage, now: i64) {
    if let Some(kind) = extract::classify_kind(&page.body) {
        entry.kind = kind;
    }

    let updated = extract::apply_all(&page.body, entry);
    log::debug!(
        "Scraping {}: extracted {}",
        entry.id(),
        if updated.is_empty() {
            "nothing".to_string()
        } else {
            updated.join(", ")
        }
    );

    if let Some(alias) = page.redirect_target {
        entry.parent_id = Some(alias);
    }
    entry.touch_scrape_time(now);
    log::info!("Scraping {}: Parsed. Kind: {}", entry.id(), entry.kind);
}

/// Progress events emitted during a batch scrape, consumed by the CLI.
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    /// An id has started processing (assigned to a worker).
    Started { index: usize, id: u32 },
    /// The entry was updated from its page.
    Completed { index: usize, id: u32, name: String },
    /// The page was unusable.
    Aborted { index: usize, id: u32, reason: AbortReason },
    /// The request itself failed.
    Failed { index: usize, id: u32, message: String },
    /// All ids processed.
    Done,
}

/// Result of scraping a batch of entries.
#[derive(Debug)]
pub struct ScrapeResult {
    /// Entries that were updated, ordered as requested.
    pub entries: Vec<CatalogEntry>,
    pub log: ScrapeLog,
}

/// Scrape each entry in place, up to `max_workers` at a time.
///
/// Pass the live records (as stored in the catalog, or bare ones for ids not
/// seen before): extraction, the achievements flag and the alias all apply to
/// what is already known about the entry. Each entry is scraped independently;
/// one failure does not stop the batch.
pub async fn scrape_many<T: StoreTransport>(
    fetcher: &StoreFetcher<T>,
    entries: Vec<CatalogEntry>,
    max_workers: usize,
    events: mpsc::UnboundedSender<ScrapeEvent>,
) -> ScrapeResult {
    let mut results: Vec<(usize, Option<CatalogEntry>, LogEntry)> = stream::iter(entries.into_iter().enumerate())
        .map(|(index, mut entry)| {
            let events = events.clone();
            async move {
                let id = entry.id();
                let _ = events.send(ScrapeEvent::Started { index, id });
                match scrape_from_store(&mut entry, fetcher).await {
                    Ok(ScrapeOutcome::Updated { alias }) => {
                        let name = entry.display_name();
                        let _ = events.send(ScrapeEvent::Completed {
                            index,
                            id,
                            name: name.clone(),
                        });
                        let log_entry = LogEntry::Updated {
                            id,
                            name,
                            kind: entry.kind,
                            alias,
                        };
                        (index, Some(entry), log_entry)
                    }
                    Ok(ScrapeOutcome::Aborted(reason)) => {
                        let _ = events.send(ScrapeEvent::Aborted { index, id, reason });
                        (index, None, LogEntry::Aborted { id, reason })
                    }
                    Err(e) => {
                        let message = e.to_string();
                        let _ = events.send(ScrapeEvent::Failed {
                            index,
                            id,
                            message: message.clone(),
                        });
                        (index, None, LogEntry::Failed { id, message })
                    }
                }
            }
        })
        .buffer_unordered(max_workers.max(1))
        .collect()
        .await;

    results.sort_by_key(|(index, ..)| *index);

    let mut entries = Vec::new();
    let mut log = ScrapeLog::new();
    for (_, entry, log_entry) in results {
        entries.extend(entry);
        log.add(log_entry);
    }

    let _ = events.send(ScrapeEvent::Done);
    ScrapeResult { entries, log }
}
