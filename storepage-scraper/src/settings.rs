//! Store settings: base URL, page language and request timeout.
//!
//! Settings live in `~/.config/storepage/settings.toml` under a `[store]`
//! table. Each value is resolved with the priority
//! env var > settings file > built-in default.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ScrapeError;

pub const DEFAULT_BASE_URL: &str = "https://store.steampowered.com";
pub const DEFAULT_LANGUAGE: &str = "english";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_BASE_URL: &str = "STOREPAGE_BASE_URL";
const ENV_LANGUAGE: &str = "STOREPAGE_LANGUAGE";
const ENV_TIMEOUT: &str = "STOREPAGE_TIMEOUT_SECS";

/// Resolved store settings.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Store root, always ending in `/`.
    pub base_url: Url,
    /// Value of the `l=` query parameter.
    pub language: String,
    pub timeout: Duration,
}

/// Where a setting's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    EnvVar(&'static str),
    ConfigFile,
    Default,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "settings file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Provenance of each setting.
#[derive(Debug, Clone)]
pub struct SettingSources {
    pub base_url: SettingSource,
    pub language: SettingSource,
    pub timeout: SettingSource,
}

#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
struct SettingsFile {
    store: Option<StoreTable>,
}

#[derive(Debug, Default, Clone, serde::Deserialize, serde::Serialize)]
struct StoreTable {
    base_url: Option<String>,
    language: Option<String>,
    timeout_secs: Option<u64>,
}

/// Canonical path to the settings file: `~/.config/storepage/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("storepage").join("settings.toml")
}

/// Default catalog file: `catalog.json` in the platform data directory.
pub fn default_catalog_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("storepage").join("catalog.json")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: normalize_base(DEFAULT_BASE_URL).expect("default base URL is valid"),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl StoreSettings {
    /// Load settings from env vars, the settings file, or defaults.
    pub fn load() -> Result<Self, ScrapeError> {
        Self::load_with_sources().map(|(settings, _)| settings)
    }

    /// Like [`load`](Self::load), also reporting where each value came from.
    pub fn load_with_sources() -> Result<(Self, SettingSources), ScrapeError> {
        let table = load_store_table();
        resolve(|var| std::env::var(var).ok(), table)
    }

    /// Store URL for one app page: `{base}/app/{id}/?l={language}`.
    pub fn app_url(&self, id: u32) -> Result<Url, ScrapeError> {
        let mut url = self.base_url.join(&format!("app/{id}/"))?;
        url.query_pairs_mut().append_pair("l", &self.language);
        Ok(url)
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ScrapeError> {
        self.base_url = normalize_base(base_url)?;
        Ok(self)
    }
}

fn resolve(
    env: impl Fn(&'static str) -> Option<String>,
    table: Option<StoreTable>,
) -> Result<(StoreSettings, SettingSources), ScrapeError> {
    let table = table.unwrap_or_default();

    let (base_url, base_src) = pick(ENV_BASE_URL, &env, table.base_url, DEFAULT_BASE_URL);
    let (language, language_src) = pick(ENV_LANGUAGE, &env, table.language, DEFAULT_LANGUAGE);

    let (timeout_secs, timeout_src) = match env(ENV_TIMEOUT) {
        Some(raw) => {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ScrapeError::config(format!("{ENV_TIMEOUT} must be a number of seconds, got '{raw}'"))
            })?;
            (secs, SettingSource::EnvVar(ENV_TIMEOUT))
        }
        None => match table.timeout_secs {
            Some(secs) => (secs, SettingSource::ConfigFile),
            None => (DEFAULT_TIMEOUT_SECS, SettingSource::Default),
        },
    };
    if timeout_secs == 0 {
        return Err(ScrapeError::config("timeout must be at least one second"));
    }

    let settings = StoreSettings {
        base_url: normalize_base(&base_url)?,
        language,
        timeout: Duration::from_secs(timeout_secs),
    };
    let sources = SettingSources {
        base_url: base_src,
        language: language_src,
        timeout: timeout_src,
    };
    Ok((settings, sources))
}

fn pick(
    var: &'static str,
    env: &impl Fn(&'static str) -> Option<String>,
    file: Option<String>,
    default: &str,
) -> (String, SettingSource) {
    if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
        return (value, SettingSource::EnvVar(var));
    }
    if let Some(value) = file.filter(|v| !v.trim().is_empty()) {
        return (value, SettingSource::ConfigFile);
    }
    (default.to_string(), SettingSource::Default)
}

/// Parse a base URL and make sure its path ends with `/` so joins append.
fn normalize_base(raw: &str) -> Result<Url, ScrapeError> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(ScrapeError::config(format!("'{raw}' cannot be used as a store base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn load_store_table() -> Option<StoreTable> {
    let contents = std::fs::read_to_string(settings_path()).ok()?;
    match toml::from_str::<SettingsFile>(&contents) {
        Ok(file) => file.store,
        Err(e) => {
            log::warn!("Ignoring unreadable settings file: {}", e);
            None
        }
    }
}

/// Save the store settings into `settings.toml`.
///
/// Uses `toml::Value` for a surgical update so unrelated tables survive.
pub fn save_settings(settings: &StoreSettings) -> io::Result<()> {
    let path = settings_path();
    let mut doc: toml::Value = if let Ok(contents) = std::fs::read_to_string(&path) {
        contents
            .parse()
            .unwrap_or_else(|_| toml::Value::Table(Default::default()))
    } else {
        toml::Value::Table(Default::default())
    };

    let table = doc
        .as_table_mut()
        .ok_or_else(|| io::Error::other("settings.toml root is not a table"))?;
    let store = table
        .entry("store")
        .or_insert_with(|| toml::Value::Table(Default::default()));
    let store_table = store
        .as_table_mut()
        .ok_or_else(|| io::Error::other("[store] is not a table"))?;

    store_table.insert(
        "base_url".to_string(),
        toml::Value::String(settings.base_url.to_string()),
    );
    store_table.insert(
        "language".to_string(),
        toml::Value::String(settings.language.clone()),
    );
    store_table.insert(
        "timeout_secs".to_string(),
        toml::Value::Integer(settings.timeout.as_secs() as i64),
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(&doc).map_err(io::Error::other)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, &serialized)?;
    std::fs::rename(&tmp, &path)?;

    Ok(())
}
