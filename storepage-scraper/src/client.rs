use std::sync::Arc;

use reqwest::cookie::Jar;
use url::Url;

use crate::error::ScrapeError;
use crate::settings::StoreSettings;

/// HTTP status the redirect walk follows by hand.
pub const FOUND: u16 = 302;

/// Cookies that get the store past its age-verification wall.
pub const AGE_GATE_COOKIES: [(&str, &str); 3] = [
    ("birthtime", "-473392799"),
    ("mature_content", "1"),
    ("lastagecheckage", "1-January-1955"),
];

/// One response as seen by the redirect walk.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub status: u16,
    /// Final URL of this response (redirects are never followed automatically).
    pub url: Url,
    pub location: Option<String>,
    /// Body text. Not read for redirect responses.
    pub body: Option<String>,
}

impl StoreResponse {
    pub fn is_redirect(&self) -> bool {
        self.status == FOUND
    }
}

/// The HTTP capability the fetcher needs: a GET with the age-gate cookies
/// attached and automatic redirects disabled.
#[allow(async_fn_in_trait)]
pub trait StoreTransport {
    async fn get(&self, url: &Url) -> Result<StoreResponse, ScrapeError>;
}

impl<T: StoreTransport> StoreTransport for Arc<T> {
    async fn get(&self, url: &Url) -> Result<StoreResponse, ScrapeError> {
        (**self).get(url).await
    }
}

/// reqwest-backed transport.
///
/// Redirects are disabled because cookies do not survive automatic
/// redirects in every stack, and the age gate needs them on every hop.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &StoreSettings) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_provider(Arc::new(age_gate_jar(&settings.base_url)))
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http })
    }
}

impl StoreTransport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<StoreResponse, ScrapeError> {
        let resp = self.http.get(url.clone()).send().await?;

        let status = resp.status().as_u16();
        let final_url = resp.url().clone();
        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = if status == FOUND {
            None
        } else {
            Some(resp.text().await?)
        };

        Ok(StoreResponse {
            status,
            url: final_url,
            location,
            body,
        })
    }
}

/// Cookie jar holding the age-gate cookies, scoped to the store's host.
fn age_gate_jar(base: &Url) -> Jar {
    let jar = Jar::default();
    let domain = base.host_str().unwrap_or_default();
    for (name, value) in AGE_GATE_COOKIES {
        jar.add_cookie_str(&format!("{name}={value}; Domain={domain}; Path=/"), base);
    }
    jar
}
