use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Catalog file could not be read or written
    #[error("Catalog error: {0}")]
    Catalog(#[from] storepage_catalog::StoreError),

    /// Settings or HTTP client setup failed
    #[error("Scraper error: {0}")]
    Scraper(#[from] storepage_scraper::ScrapeError),

    /// Entry not present in the catalog
    #[error("No entry with id {0} in {1}")]
    NotFound(u32, String),

    /// Some pages could not be fetched at all
    #[error("{failed} of {total} ids could not be fetched")]
    ScrapeFailed { failed: usize, total: usize },

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub(crate) fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
