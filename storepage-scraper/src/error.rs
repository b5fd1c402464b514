use std::fmt;

/// Errors that escape a scrape: the environment is broken, not the page.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Why a store page was not used. These are expected outcomes of scraping
/// an untrusted document and never surface as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    RedirectedToHome,
    SelfRedirect,
    TooManyRedirects,
    /// A redirect response without a usable `Location` header.
    MissingLocation,
    OutsideAppRoute,
    MissingId,
    AgeCheckNoRedirect,
    AgeCheckUnparseableId,
    RedirectedToUnknownId,
    EmptyBody,
    SiteError,
    UnrecognizedPage,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RedirectedToHome => "RedirectedToHome",
            Self::SelfRedirect => "SelfRedirect",
            Self::TooManyRedirects => "TooManyRedirects",
            Self::MissingLocation => "MissingLocation",
            Self::OutsideAppRoute => "OutsideAppRoute",
            Self::MissingId => "MissingId",
            Self::AgeCheckNoRedirect => "AgeCheckNoRedirect",
            Self::AgeCheckUnparseableId => "AgeCheckUnparseableId",
            Self::RedirectedToUnknownId => "RedirectedToUnknownId",
            Self::EmptyBody => "EmptyBody",
            Self::SiteError => "SiteError",
            Self::UnrecognizedPage => "UnrecognizedPage",
        }
    }

    /// Human-readable description used in logs.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::RedirectedToHome => "redirected to main store page",
            Self::SelfRedirect => "store page redirected to itself",
            Self::TooManyRedirects => "too many redirects",
            Self::MissingLocation => "redirect without a location",
            Self::OutsideAppRoute => "redirected outside the app (app/) route",
            Self::MissingId => "response URI ends with 'app' thus missing ID",
            Self::AgeCheckNoRedirect => "encountered an age check without redirect",
            Self::AgeCheckUnparseableId => "age check redirected to a non-numeric id",
            Self::RedirectedToUnknownId => "redirected to an unknown id",
            Self::EmptyBody => "the response body was empty",
            Self::SiteError => "received Site Error",
            Self::UnrecognizedPage => "could not parse info from page",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.as_str())
    }
}
