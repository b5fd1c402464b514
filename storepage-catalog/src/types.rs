//! Data model types for store catalog entries.
//!
//! A [`CatalogEntry`] is one storefront item (game, application or DLC) as
//! known to the catalog, populated from two independently paced sources:
//! the bulk metadata import and the store page scraper.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Flag added when a page shows an achievements block.
pub const ACHIEVEMENTS_FLAG: &str = "Steam Achievements";

// ── Kind ────────────────────────────────────────────────────────────────────

/// What sort of catalog item an entry describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppKind {
    #[default]
    Unknown,
    Game,
    Application,
    #[serde(rename = "DLC")]
    Dlc,
}

impl AppKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Game => "Game",
            Self::Application => "Application",
            Self::Dlc => "DLC",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Platforms ───────────────────────────────────────────────────────────────

/// Set of operating systems an entry runs on, stored as a bitset.
///
/// Serializes as its bit value (Windows = 1, Mac = 2, Linux = 4). Unknown
/// bits are dropped on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Platforms(u8);

impl Platforms {
    pub const NONE: Self = Self(0);
    pub const WINDOWS: Self = Self(1);
    pub const MAC: Self = Self(1 << 1);
    pub const LINUX: Self = Self(1 << 2);
    pub const ALL: Self = Self(0b111);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Names of the contained platforms, in Windows/Mac/Linux order.
    pub fn names(self) -> Vec<&'static str> {
        [
            (Self::WINDOWS, "Windows"),
            (Self::MAC, "Mac"),
            (Self::LINUX, "Linux"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

impl From<u8> for Platforms {
    fn from(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<Platforms> for u8 {
    fn from(platforms: Platforms) -> Self {
        platforms.0
    }
}

impl BitOr for Platforms {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Platforms {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Platforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        f.write_str(&self.names().join(", "))
    }
}

// ── Language / VR support ───────────────────────────────────────────────────

/// Per-language support, split by what is localized.
///
/// A language may appear in any subset of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageSupport {
    pub interface_languages: Vec<String>,
    pub full_audio_languages: Vec<String>,
    pub subtitle_languages: Vec<String>,
}

impl LanguageSupport {
    pub fn is_empty(&self) -> bool {
        self.interface_languages.is_empty()
            && self.full_audio_languages.is_empty()
            && self.subtitle_languages.is_empty()
    }
}

/// Free-text VR capability strings as listed on the store page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VrSupport {
    pub headsets: Vec<String>,
    pub input: Vec<String>,
    pub play_area: Vec<String>,
}

impl VrSupport {
    pub fn is_empty(&self) -> bool {
        self.headsets.is_empty() && self.input.is_empty() && self.play_area.is_empty()
    }
}

// ── Catalog entry ───────────────────────────────────────────────────────────

/// A single store item and everything known about it.
///
/// `last_metadata_update_time` and `last_scrape_time` are Unix timestamps
/// (seconds); `0` means the corresponding source never populated the entry.
/// Both only ever increase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogEntry {
    id: u32,
    pub parent_id: Option<u32>,
    pub kind: AppKind,
    pub name: Option<String>,

    pub genres: Vec<String>,
    pub flags: Vec<String>,
    pub tags: Vec<String>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,

    pub platforms: Platforms,

    pub total_achievements: u32,
    pub review_positive_percentage: u32,
    pub review_total: u32,
    /// Release date as displayed by the store; never parsed.
    pub release_date_text: Option<String>,
    pub metacritic_slug: Option<String>,

    pub language_support: LanguageSupport,
    pub vr_support: VrSupport,

    pub last_metadata_update_time: i64,
    pub last_scrape_time: i64,

    /// Cached banner image handle for display. Never persisted.
    #[serde(skip)]
    pub banner: Option<String>,
}

impl CatalogEntry {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_name(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Display name, falling back to the numeric id.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("#{}", self.id),
        }
    }

    /// Add `flag` unless it is already present.
    pub fn ensure_flag(&mut self, flag: &str) {
        if !self.flags.iter().any(|f| f == flag) {
            self.flags.push(flag.to_string());
        }
    }

    /// Move `last_scrape_time` forward to `now`, never backwards.
    pub fn touch_scrape_time(&mut self, now: i64) {
        self.last_scrape_time = self.last_scrape_time.max(now);
    }

    /// Move `last_metadata_update_time` forward to `now`, never backwards.
    pub fn touch_metadata_time(&mut self, now: i64) {
        self.last_metadata_update_time = self.last_metadata_update_time.max(now);
    }
}
