pub mod client;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod log;
pub mod scrape;
pub mod settings;

pub use client::{HttpTransport, StoreResponse, StoreTransport};
pub use error::{AbortReason, ScrapeError};
pub use fetch::{FetchOutcome, FetchedPage, MAX_REDIRECTS, StoreFetcher};
pub use crate::log::{LogEntry, LogSummary, ScrapeLog};
pub use scrape::{
    ScrapeEvent, ScrapeOutcome, ScrapeResult, apply_page, scrape_from_store,
    scrape_from_store_at, scrape_many,
};
pub use settings::{
    SettingSource, SettingSources, StoreSettings, default_catalog_path, save_settings,
    settings_path,
};
