//! Fetching one store page and walking its redirect chain.
//!
//! The walk is an explicit state machine. Every transition except the
//! request itself is a plain function of the previous response, so the
//! redirect rules can be tested without a network.
//!
//! ```text
//! Requesting --302--> Following --ok--> Requesting (hops + 1)
//!     |                   `--abort--> Aborted
//!     `--other--> Classifying --agecheck/--> AgeChecking --> Reading | Aborted
//!                     |--app/--> Reading | Aborted
//!                     `--else--> Aborted
//! Reading --> Done | Aborted
//! ```

use url::Url;

use crate::client::{StoreResponse, StoreTransport};
use crate::error::{AbortReason, ScrapeError};
use crate::extract::{self, SITE_ERROR_MARKER};
use crate::settings::StoreSettings;

/// Maximum number of redirects followed before giving up.
pub const MAX_REDIRECTS: u8 = 5;

const APP_ROUTE: &str = "app/";
const AGECHECK_ROUTE: &str = "agecheck/";

/// A store page that passed every structural check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub body: String,
    /// URL the body was read from.
    pub url: Url,
    /// Another id the store routed this request to, if any.
    pub redirect_target: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Page(FetchedPage),
    Aborted(AbortReason),
}

#[derive(Debug)]
enum WalkState {
    Requesting { url: Url, hops: u8 },
    Following { response: StoreResponse, hops: u8 },
    Classifying { response: StoreResponse },
    AgeChecking { response: StoreResponse, segments: Vec<String> },
    Reading { response: StoreResponse, redirect_target: Option<u32> },
    Done(FetchedPage),
    Aborted(AbortReason),
}

/// Fetches store pages for one store/language through a [`StoreTransport`].
pub struct StoreFetcher<T> {
    transport: T,
    settings: StoreSettings,
}

impl<T: StoreTransport> StoreFetcher<T> {
    pub fn new(transport: T, settings: StoreSettings) -> Self {
        Self { transport, settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the page for `id`.
    ///
    /// Aborts are returned as [`FetchOutcome::Aborted`]; only transport
    /// failures are errors.
    pub async fn fetch(&self, id: u32) -> Result<FetchOutcome, ScrapeError> {
        let base = &self.settings.base_url;
        let mut state = WalkState::Requesting {
            url: self.settings.app_url(id)?,
            hops: 0,
        };

        loop {
            state = match state {
                WalkState::Requesting { url, hops } => {
                    log::debug!("Scraping {}: GET {}", id, url);
                    let response = match self.transport.get(&url).await {
                        Ok(response) => response,
                        Err(e) => {
                            log::error!("Scraping {}: request to {} failed: {}", id, url, e);
                            return Err(e);
                        }
                    };
                    if response.is_redirect() {
                        WalkState::Following { response, hops }
                    } else {
                        WalkState::Classifying { response }
                    }
                }
                WalkState::Following { response, hops } => follow(&response, hops, base),
                WalkState::Classifying { response } => classify(response, id, base),
                WalkState::AgeChecking { response, segments } => {
                    age_check(response, &segments, id)
                }
                WalkState::Reading {
                    response,
                    redirect_target,
                } => read(response, redirect_target, id),
                WalkState::Done(page) => return Ok(FetchOutcome::Page(page)),
                WalkState::Aborted(reason) => {
                    log::debug!("Scraping {}: {}, aborting scraping", id, reason);
                    return Ok(FetchOutcome::Aborted(reason));
                }
            };
        }
    }
}

/// Decide whether a 302 response is worth following.
fn follow(response: &StoreResponse, hops: u8, base: &Url) -> WalkState {
    if hops >= MAX_REDIRECTS {
        return WalkState::Aborted(AbortReason::TooManyRedirects);
    }
    let Some(target) = response
        .location
        .as_deref()
        .and_then(|location| response.url.join(location).ok())
    else {
        return WalkState::Aborted(AbortReason::MissingLocation);
    };

    if is_store_root(&target, base) {
        WalkState::Aborted(AbortReason::RedirectedToHome)
    } else if target == response.url {
        WalkState::Aborted(AbortReason::SelfRedirect)
    } else {
        WalkState::Requesting {
            url: target,
            hops: hops + 1,
        }
    }
}

/// Route the final response by its path: app page, age check or neither.
fn classify(response: StoreResponse, id: u32, base: &Url) -> WalkState {
    let segments = route_segments(&response.url, base);
    if segments.len() < 2 {
        return WalkState::Aborted(AbortReason::RedirectedToHome);
    }

    match segments[1].as_str() {
        AGECHECK_ROUTE => WalkState::AgeChecking { response, segments },
        APP_ROUTE => {
            let Some(raw) = segments.get(2) else {
                return WalkState::Aborted(AbortReason::MissingId);
            };
            let landed = raw.trim_end_matches('/');
            if landed == id.to_string() {
                return WalkState::Reading {
                    response,
                    redirect_target: None,
                };
            }
            match landed.parse::<u32>() {
                Ok(alias) => {
                    log::info!("Scraping {}: redirected to {}", id, alias);
                    WalkState::Reading {
                        response,
                        redirect_target: Some(alias),
                    }
                }
                Err(_) => WalkState::Aborted(AbortReason::RedirectedToUnknownId),
            }
        }
        _ => WalkState::Aborted(AbortReason::OutsideAppRoute),
    }
}

/// An age-check page only counts if it routes somewhere other than `id`.
fn age_check(response: StoreResponse, segments: &[String], id: u32) -> WalkState {
    let Some(raw) = segments.get(3) else {
        return WalkState::Aborted(AbortReason::AgeCheckNoRedirect);
    };
    let target = raw.trim_end_matches('/');
    if target == id.to_string() {
        return WalkState::Aborted(AbortReason::AgeCheckNoRedirect);
    }
    match target.parse::<u32>() {
        Ok(alias) => {
            log::info!("Scraping {}: age check redirected to {}", id, alias);
            WalkState::Reading {
                response,
                redirect_target: Some(alias),
            }
        }
        Err(_) => WalkState::Aborted(AbortReason::AgeCheckUnparseableId),
    }
}

/// Check the body and hand it over.
fn read(response: StoreResponse, redirect_target: Option<u32>, id: u32) -> WalkState {
    let Some(body) = response.body.filter(|b| !b.is_empty()) else {
        return WalkState::Aborted(AbortReason::EmptyBody);
    };
    log::info!("Scraping {}: Page read", id);

    if body.contains(SITE_ERROR_MARKER) {
        return WalkState::Aborted(AbortReason::SiteError);
    }
    if !extract::is_app_page(&body) {
        return WalkState::Aborted(AbortReason::UnrecognizedPage);
    }

    WalkState::Done(FetchedPage {
        body,
        url: response.url,
        redirect_target,
    })
}

/// Split a URL path into segments that keep their trailing slash:
/// `/app/440/` becomes `["/", "app/", "440/"]`.
pub fn path_segments(url: &Url) -> Vec<String> {
    split_path(url.path())
}

fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut rest = path;
    if let Some(stripped) = rest.strip_prefix('/') {
        segments.push("/".to_string());
        rest = stripped;
    }
    while !rest.is_empty() {
        match rest.find('/') {
            Some(i) => {
                segments.push(rest[..=i].to_string());
                rest = &rest[i + 1..];
            }
            None => {
                segments.push(rest.to_string());
                break;
            }
        }
    }
    segments
}

/// Segments of `url` relative to the store root, so a base URL with a path
/// prefix routes the same way as the bare host.
fn route_segments(url: &Url, base: &Url) -> Vec<String> {
    let prefix = base.path().trim_end_matches('/');
    match url.path().strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && url.origin() == base.origin() => split_path(rest),
        _ => path_segments(url),
    }
}

fn is_store_root(target: &Url, base: &Url) -> bool {
    let at_root = target.path() == "/" || target.path() == base.path();
    at_root && target.query().is_none() && target.host_str() == base.host_str()
}
