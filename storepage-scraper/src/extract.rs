//! Field extractors for store pages.
//!
//! Each extractor is an independent partial-match rule over the raw page
//! text. No match means "nothing observed": the field keeps its current
//! value. Extractors run in [`EXTRACTORS`] order against the live entry,
//! which matters for one case only: the achievements extractor makes sure
//! the achievements flag survives the flags extractor.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;
use storepage_catalog::{ACHIEVEMENTS_FLAG, AppKind, CatalogEntry, LanguageSupport, Platforms};

/// Store link prefix, accepting both schemes.
const STORE: &str = r"https?://store\.steampowered\.com";

/// Marker for the store's generic error page.
pub const SITE_ERROR_MARKER: &str = "<title>Site Error</title>";

const PLATFORM_WINDOWS: &str = r#"<span class="platform_img win"></span>"#;
const PLATFORM_MAC: &str = r#"<span class="platform_img mac"></span>"#;
const PLATFORM_LINUX: &str = r#"<span class="platform_img linux"></span>"#;

/// Language rows the store failed to localize.
const PLACEHOLDER_PREFIXES: [&str; 2] = ["#lang", "("];

fn store_regex(pattern: &str) -> Regex {
    Regex::new(&pattern.replace("{STORE}", STORE)).expect("store page pattern is valid")
}

static RE_GAME_CHECK: LazyLock<Regex> =
    LazyLock::new(|| store_regex(r#"<a href="{STORE}/search/\?term=&snr="#));
static RE_SOFTWARE_CHECK: LazyLock<Regex> =
    LazyLock::new(|| store_regex(r#"<a href="{STORE}/search/\?category1=994&snr="#));
static RE_DLC_CHECK: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<img class="category_icon" src="https?://store\.akamai\.steamstatic\.com/public/images/v6/ico/ico_dlc\.png">"#,
    )
});

static RE_GENRE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<div class="details_block">\s*<b>[^:]*:</b>.*?<br>\s*<b>[^:]*:</b>\s*((?:<a href="{STORE}/genre/[^>]*>[^<]+</a>,?\s*)+)\s*<br>"#,
    )
});
static RE_GENRE_LINK: LazyLock<Regex> =
    LazyLock::new(|| store_regex(r#"<a href="{STORE}/genre/[^>]*>([^<]+)</a>"#));

static RE_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(r#"<a class="name" href="{STORE}/search/\?category2=.*?">([^<]*)</a>"#)
});
static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| store_regex(r#"<a[^>]*class="app_tag"[^>]*>([^<]*)</a>"#));

static RE_DEVELOPER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(r#"((?:<a href="{STORE}/search/\?developer=[^"]*">[^<]+</a>,?\s*)+)\s*<br>"#)
});
static RE_DEVELOPER_LINK: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(r#"<a href="{STORE}/search/\?developer=[^"]*">([^<]+)</a>"#)
});
static RE_PUBLISHER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(r#"((?:<a href="{STORE}/search/\?publisher=[^"]*">[^<]+</a>,?\s*)+)\s*<br>"#)
});
static RE_PUBLISHER_LINK: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(r#"<a href="{STORE}/search/\?publisher=[^"]*">([^<]+)</a>"#)
});

// VR sections are delimited by three consecutive details blocks.
static RE_VR_HEADSETS: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"(?s)<div class="details_block vrsupport">(.*)<div class="details_block vrsupport">.*<div class="details_block vrsupport">"#,
    )
});
static RE_VR_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"(?s)<div class="details_block vrsupport">.*<div class="details_block vrsupport">(.*)<div class="details_block vrsupport">"#,
    )
});
static RE_VR_PLAY_AREA: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"(?s)<div class="details_block vrsupport">.*<div class="details_block vrsupport">.*<div class="details_block vrsupport">(.*)"#,
    )
});
static RE_VR_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<div class="game_area_details_specs">.*?<a class="name" href="{STORE}/search/\?vrsupport=\d*">([^<]*)</a></div>"#,
    )
});

static RE_LANGUAGE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<td style="width: 94px; text-align: left" class="ellipsis">\s*([^<]*)\s*</td>\s*<td class="checkcol">\s*(.*?)\s*</td>\s*<td class="checkcol">\s*(.*?)\s*</td>\s*<td class="checkcol">\s*(.*?)\s*</td>"#,
    )
});

static RE_ACHIEVEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<div (?:id="achievement_block" ?|class="block responsive_apppage_details_right" ?){2}>\s*<div class="block_title">[^\d]*(\d+)[^\d<]*</div>\s*<div class="communitylink_achievement_images">"#,
    )
});
static RE_RELEASE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<div class="release_date">\s*<div[^>]*>[^<]*</div>\s*<div class="date">([^<]+)</div>"#,
    )
});
static RE_REVIEWS: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<span class="(?:nonresponsive_hidden ?| responsive_reviewdesc ?){2}">[^\d]*(\d+)%[^\d]*([\d.,]+)[^\d]*\s*</span>"#,
    )
});
static RE_METALINK: LazyLock<Regex> = LazyLock::new(|| {
    store_regex(
        r#"<div id="game_area_metalink">\s*<a href="https?://www\.metacritic\.com/game/pc/([^"]*)\?ftag="#,
    )
});
static RE_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#?[0-9A-Za-z]+;").expect("entity pattern is valid"));

// ── Updates ─────────────────────────────────────────────────────────────────

/// A value observed on a page for one field (or field group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Genres(Vec<String>),
    Flags(Vec<String>),
    Tags(Vec<String>),
    Developers(Vec<String>),
    Publishers(Vec<String>),
    VrHeadsets(Vec<String>),
    VrInput(Vec<String>),
    VrPlayArea(Vec<String>),
    Languages(LanguageSupport),
    /// The achievements block was present; the count may not have parsed.
    Achievements(Option<u32>),
    ReleaseDate(String),
    Reviews {
        positive_percentage: Option<u32>,
        total: Option<u32>,
    },
    MetacriticSlug(String),
    Platform(Platforms),
}

impl FieldUpdate {
    /// Write this observation into `entry`.
    ///
    /// Lists are replaced wholesale; platforms are unioned.
    pub fn apply(self, entry: &mut CatalogEntry) {
        match self {
            Self::Genres(v) => entry.genres = v,
            Self::Flags(v) => entry.flags = v,
            Self::Tags(v) => entry.tags = v,
            Self::Developers(v) => entry.developers = v,
            Self::Publishers(v) => entry.publishers = v,
            Self::VrHeadsets(v) => entry.vr_support.headsets = v,
            Self::VrInput(v) => entry.vr_support.input = v,
            Self::VrPlayArea(v) => entry.vr_support.play_area = v,
            Self::Languages(languages) => entry.language_support = languages,
            Self::Achievements(count) => {
                // The flags list and the achievements block disagree on some pages.
                entry.ensure_flag(ACHIEVEMENTS_FLAG);
                if let Some(count) = count {
                    entry.total_achievements = count;
                }
            }
            Self::ReleaseDate(text) => entry.release_date_text = Some(text),
            Self::Reviews {
                positive_percentage,
                total,
            } => {
                if let Some(pct) = positive_percentage {
                    entry.review_positive_percentage = pct;
                }
                if let Some(total) = total {
                    entry.review_total = total;
                }
            }
            Self::MetacriticSlug(slug) => entry.metacritic_slug = Some(slug),
            Self::Platform(platform) => entry.platforms |= platform,
        }
    }
}

// ── Extractor table ─────────────────────────────────────────────────────────

/// A named, independent rule producing at most one update from a page.
pub struct Extractor {
    pub field: &'static str,
    pub extract: fn(&str) -> Option<FieldUpdate>,
}

/// All extractors, in application order. Flags must precede achievements.
pub static EXTRACTORS: &[Extractor] = &[
    Extractor { field: "genres", extract: extract_genres },
    Extractor { field: "flags", extract: extract_flags },
    Extractor { field: "tags", extract: extract_tags },
    Extractor { field: "vr.headsets", extract: extract_vr_headsets },
    Extractor { field: "vr.input", extract: extract_vr_input },
    Extractor { field: "vr.play_area", extract: extract_vr_play_area },
    Extractor { field: "languages", extract: extract_languages },
    Extractor { field: "achievements", extract: extract_achievements },
    Extractor { field: "developers", extract: extract_developers },
    Extractor { field: "publishers", extract: extract_publishers },
    Extractor { field: "release_date", extract: extract_release_date },
    Extractor { field: "reviews", extract: extract_reviews },
    Extractor { field: "metacritic", extract: extract_metacritic },
    Extractor { field: "platform.windows", extract: extract_windows },
    Extractor { field: "platform.mac", extract: extract_mac },
    Extractor { field: "platform.linux", extract: extract_linux },
];

/// Run every extractor over `page`, applying updates to `entry` as they come.
///
/// Returns the names of the fields that were updated.
pub fn apply_all(page: &str, entry: &mut CatalogEntry) -> Vec<&'static str> {
    if page.trim().is_empty() {
        return Vec::new();
    }

    let mut updated = Vec::new();
    for extractor in EXTRACTORS {
        if let Some(update) = (extractor.extract)(page) {
            update.apply(entry);
            updated.push(extractor.field);
        }
    }
    updated
}

/// Whether the page looks like a game or software page at all.
pub fn is_app_page(page: &str) -> bool {
    RE_GAME_CHECK.is_match(page) || RE_SOFTWARE_CHECK.is_match(page)
}

/// Classify the page. DLC wins over everything, and Game over Application.
pub fn classify_kind(page: &str) -> Option<AppKind> {
    if RE_DLC_CHECK.is_match(page) {
        Some(AppKind::Dlc)
    } else if RE_GAME_CHECK.is_match(page) {
        Some(AppKind::Game)
    } else if RE_SOFTWARE_CHECK.is_match(page) {
        Some(AppKind::Application)
    } else {
        None
    }
}

// ── Individual extractors ───────────────────────────────────────────────────

pub fn extract_genres(page: &str) -> Option<FieldUpdate> {
    links_in_block(page, &RE_GENRE_BLOCK, &RE_GENRE_LINK).map(FieldUpdate::Genres)
}

pub fn extract_flags(page: &str) -> Option<FieldUpdate> {
    all_captures(page, &RE_FLAG).map(FieldUpdate::Flags)
}

pub fn extract_tags(page: &str) -> Option<FieldUpdate> {
    all_captures(page, &RE_TAG).map(FieldUpdate::Tags)
}

pub fn extract_developers(page: &str) -> Option<FieldUpdate> {
    links_in_block(page, &RE_DEVELOPER_BLOCK, &RE_DEVELOPER_LINK).map(FieldUpdate::Developers)
}

pub fn extract_publishers(page: &str) -> Option<FieldUpdate> {
    links_in_block(page, &RE_PUBLISHER_BLOCK, &RE_PUBLISHER_LINK).map(FieldUpdate::Publishers)
}

pub fn extract_vr_headsets(page: &str) -> Option<FieldUpdate> {
    vr_section(page, &RE_VR_HEADSETS).map(FieldUpdate::VrHeadsets)
}

pub fn extract_vr_input(page: &str) -> Option<FieldUpdate> {
    vr_section(page, &RE_VR_INPUT).map(FieldUpdate::VrInput)
}

pub fn extract_vr_play_area(page: &str) -> Option<FieldUpdate> {
    vr_section(page, &RE_VR_PLAY_AREA).map(FieldUpdate::VrPlayArea)
}

/// Language table rows. Any matched row replaces all three lists; placeholder
/// rows are then skipped.
pub fn extract_languages(page: &str) -> Option<FieldUpdate> {
    let mut support = LanguageSupport::default();
    let mut rows = 0usize;

    for caps in RE_LANGUAGE_ROW.captures_iter(page) {
        rows += 1;
        let language = decode_html(caps[1].trim()).into_owned();
        if language.is_empty()
            || PLACEHOLDER_PREFIXES
                .iter()
                .any(|prefix| language.starts_with(prefix))
        {
            continue;
        }

        let supported = |i: usize| !decode_html(caps[i].trim()).trim().is_empty();
        if supported(2) {
            support.interface_languages.push(language.clone());
        }
        if supported(3) {
            support.full_audio_languages.push(language.clone());
        }
        if supported(4) {
            support.subtitle_languages.push(language);
        }
    }

    (rows > 0).then_some(FieldUpdate::Languages(support))
}

pub fn extract_achievements(page: &str) -> Option<FieldUpdate> {
    let caps = RE_ACHIEVEMENTS.captures(page)?;
    Some(FieldUpdate::Achievements(caps[1].parse().ok()))
}

pub fn extract_release_date(page: &str) -> Option<FieldUpdate> {
    let caps = RE_RELEASE_DATE.captures(page)?;
    clean_text(&caps[1]).map(FieldUpdate::ReleaseDate)
}

pub fn extract_reviews(page: &str) -> Option<FieldUpdate> {
    let caps = RE_REVIEWS.captures(page)?;
    let positive_percentage = caps[1].parse().ok();
    let total = parse_grouped_count(&caps[2]);
    if positive_percentage.is_none() && total.is_none() {
        return None;
    }
    Some(FieldUpdate::Reviews {
        positive_percentage,
        total,
    })
}

pub fn extract_metacritic(page: &str) -> Option<FieldUpdate> {
    let caps = RE_METALINK.captures(page)?;
    let slug = caps[1].trim();
    (!slug.is_empty()).then(|| FieldUpdate::MetacriticSlug(slug.to_string()))
}

fn extract_windows(page: &str) -> Option<FieldUpdate> {
    platform_marker(page, PLATFORM_WINDOWS, Platforms::WINDOWS)
}

fn extract_mac(page: &str) -> Option<FieldUpdate> {
    platform_marker(page, PLATFORM_MAC, Platforms::MAC)
}

fn extract_linux(page: &str) -> Option<FieldUpdate> {
    platform_marker(page, PLATFORM_LINUX, Platforms::LINUX)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn platform_marker(page: &str, marker: &str, platform: Platforms) -> Option<FieldUpdate> {
    page.contains(marker).then_some(FieldUpdate::Platform(platform))
}

/// Every capture of group 1, cleaned. `None` when nothing usable matched.
fn all_captures(text: &str, re: &Regex) -> Option<Vec<String>> {
    let values: Vec<String> = re
        .captures_iter(text)
        .filter_map(|caps| clean_text(&caps[1]))
        .collect();
    (!values.is_empty()).then_some(values)
}

/// Find the first `block` match and collect the `link` captures inside it.
fn links_in_block(page: &str, block: &Regex, link: &Regex) -> Option<Vec<String>> {
    let caps = block.captures(page)?;
    all_captures(&caps[1], link)
}

/// Locate a VR section and scan it with the shared capability-flag rule.
fn vr_section(page: &str, section: &Regex) -> Option<Vec<String>> {
    let caps = section.captures(page)?;
    all_captures(caps[1].trim(), &RE_VR_FLAG)
}

/// Decode entities and trim. Whitespace-only values become `None`.
fn clean_text(raw: &str) -> Option<String> {
    let decoded = decode_html(raw.trim());
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Decode HTML entities (named and numeric). A stray `&` or an unknown
/// entity is kept verbatim while the valid entities around it are decoded.
pub fn decode_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    match unescape_with(raw, resolve_html5_entity) {
        Ok(decoded) => decoded,
        Err(_) => RE_ENTITY.replace_all(raw, |caps: &regex::Captures<'_>| {
            unescape_with(&caps[0], resolve_html5_entity)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| caps[0].to_string())
        }),
    }
}

/// Parse a count that may carry thousands separators (`12,345` or `12.345`).
fn parse_grouped_count(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ',' | '.')).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
